use super::error::EngineError;
use nalgebra::{Matrix3, Vector3};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DumpFrequency {
    /// Once per outer lattice iteration.
    Lattice,
    /// Once, after the run finished.
    End,
}

/// The cell and ions as they stand when a hook fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LatticeSnapshot {
    pub iteration: usize,
    pub energy: f64,
    /// Row-major.
    pub strain: [[f64; 3]; 3],
    pub lattice_vectors: [[f64; 3]; 3],
    pub volume: f64,
    pub positions: Vec<[f64; 3]>,
}

impl LatticeSnapshot {
    pub fn new(
        iteration: usize,
        energy: f64,
        strain: &Matrix3<f64>,
        cell: &Matrix3<f64>,
        positions: &[Vector3<f64>],
    ) -> Self {
        Self {
            iteration,
            energy,
            strain: [0, 1, 2].map(|i| [0, 1, 2].map(|j| strain[(i, j)])),
            lattice_vectors: [0, 1, 2].map(|k| [0, 1, 2].map(|i| cell[(i, k)])),
            volume: cell.determinant(),
            positions: positions.iter().map(|x| [x.x, x.y, x.z]).collect(),
        }
    }
}

pub trait DumpHook {
    fn dump(
        &mut self,
        frequency: DumpFrequency,
        iteration: usize,
        snapshot: &LatticeSnapshot,
    ) -> Result<(), EngineError>;
}

/// Collects every lattice-keyed snapshot in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatticeTrajectory {
    pub frames: Vec<LatticeSnapshot>,
}

impl LatticeTrajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn last(&self) -> Option<&LatticeSnapshot> {
        self.frames.last()
    }
}

impl DumpHook for LatticeTrajectory {
    fn dump(
        &mut self,
        frequency: DumpFrequency,
        _iteration: usize,
        snapshot: &LatticeSnapshot,
    ) -> Result<(), EngineError> {
        if frequency == DumpFrequency::Lattice {
            self.frames.push(snapshot.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(iteration: usize) -> LatticeSnapshot {
        let cell = Matrix3::new(2.0, 0.5, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 4.0);
        LatticeSnapshot::new(
            iteration,
            -1.0,
            &Matrix3::zeros(),
            &cell,
            &[Vector3::new(0.25, 0.5, 0.0)],
        )
    }

    #[test]
    fn snapshot_stores_lattice_vectors_as_rows() {
        let frame = snapshot(0);
        assert_eq!(frame.lattice_vectors[1], [0.5, 3.0, 0.0]);
        assert!((frame.volume - 24.0).abs() < 1e-12);
        assert_eq!(frame.positions, vec![[0.25, 0.5, 0.0]]);
    }

    #[test]
    fn trajectory_keeps_only_lattice_frames() {
        let mut trajectory = LatticeTrajectory::new();
        trajectory.dump(DumpFrequency::Lattice, 0, &snapshot(0)).unwrap();
        trajectory.dump(DumpFrequency::Lattice, 1, &snapshot(1)).unwrap();
        trajectory.dump(DumpFrequency::End, 1, &snapshot(1)).unwrap();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.last().map(|f| f.iteration), Some(1));
    }

    #[test]
    fn trajectory_serializes_to_toml() {
        let mut trajectory = LatticeTrajectory::new();
        trajectory.dump(DumpFrequency::Lattice, 0, &snapshot(0)).unwrap();
        let text = toml::to_string(&trajectory).unwrap();
        assert!(text.contains("lattice-vectors"));
    }
}
