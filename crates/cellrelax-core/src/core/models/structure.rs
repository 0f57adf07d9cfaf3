use super::atom::Atom;
use crate::core::forcefield::params::Species;
use crate::core::lattice::symmetry::SymmetryGroup;
use nalgebra::{Matrix3, Vector3};

/// A periodic crystal: cell, grid, point group, force field species and ions.
///
/// Lattice vectors are the columns of `lattice`.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub lattice: Matrix3<f64>,
    pub sample_counts: [usize; 3],
    pub symmetries: SymmetryGroup,
    pub species: Vec<Species>,
    pub atoms: Vec<Atom>,
}

impl Structure {
    pub fn new(lattice: Matrix3<f64>, species: Vec<Species>, atoms: Vec<Atom>) -> Self {
        Self {
            lattice,
            sample_counts: [1, 1, 1],
            symmetries: SymmetryGroup::identity(),
            species,
            atoms,
        }
    }

    pub fn with_symmetries(mut self, symmetries: SymmetryGroup) -> Self {
        self.symmetries = symmetries;
        self
    }

    pub fn with_sample_counts(mut self, sample_counts: [usize; 3]) -> Self {
        self.sample_counts = sample_counts;
        self
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Overwrites atom positions in order. Extra positions are ignored.
    pub fn set_positions(&mut self, positions: &[Vector3<f64>]) {
        for (atom, &position) in self.atoms.iter_mut().zip(positions) {
            atom.position = position;
        }
    }

    pub fn fixed_mask(&self) -> Vec<bool> {
        self.atoms.iter().map(|a| a.fixed).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_round_trip_through_setter() {
        let mut structure = Structure::new(
            Matrix3::identity(),
            vec![],
            vec![
                Atom::new("A", Vector3::zeros()),
                Atom::new("B", Vector3::new(0.5, 0.5, 0.5)).fixed(),
            ],
        );
        let moved = vec![Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.4, 0.5, 0.5)];
        structure.set_positions(&moved);
        assert_eq!(structure.positions(), moved);
        assert_eq!(structure.fixed_mask(), vec![false, true]);
        assert_eq!(structure.sample_counts, [1, 1, 1]);
    }
}
