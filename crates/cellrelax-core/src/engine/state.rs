use super::error::EngineError;
use super::providers::{ElectronicEnergyProvider, IonicEnergyProvider};
use crate::core::forcefield::coulomb::{CoulombOperator, CoulombParams};
use crate::core::forcefield::term::EnergyTerm;
use crate::core::lattice::geometry::GeometryContext;
use nalgebra::Matrix3;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Full,
    /// Leaves the electronic term at its last value. Used by stress probes.
    SkipElectronic,
}

/// Everything that depends on the cell shape.
///
/// All mutation after construction goes through [`SimulationState::propagate`]
/// or [`SimulationState::refresh_ions`], so the geometry, the Coulomb operator
/// and the ionic tables are always consistent with one cell.
pub struct SimulationState {
    geometry: GeometryContext,
    coulomb_params: CoulombParams,
    coulomb: CoulombOperator,
    ions: Box<dyn IonicEnergyProvider + Send>,
    electronic: Option<Box<dyn ElectronicEnergyProvider + Send>>,
    energies: EnergyTerm,
}

impl SimulationState {
    /// Builds the state and evaluates the ionic energy at the starting cell.
    pub fn new(
        geometry: GeometryContext,
        coulomb_params: CoulombParams,
        mut ions: Box<dyn IonicEnergyProvider + Send>,
    ) -> Result<Self, EngineError> {
        let coulomb = coulomb_params.create(&geometry);
        let mut energies = EnergyTerm::default();
        ions.update(&geometry, &coulomb, &mut energies)?;
        Ok(Self {
            geometry,
            coulomb_params,
            coulomb,
            ions,
            electronic: None,
            energies,
        })
    }

    pub fn with_electronic(
        mut self,
        mut electronic: Box<dyn ElectronicEnergyProvider + Send>,
    ) -> Result<Self, EngineError> {
        electronic.energy_and_gradient(&self.geometry, &mut self.energies)?;
        self.electronic = Some(electronic);
        Ok(self)
    }

    /// Pushes a new cell into every lattice-dependent subsystem.
    ///
    /// Sample counts and other cell-independent quantities are left alone.
    pub fn propagate(&mut self, cell: &Matrix3<f64>, mode: UpdateMode) -> Result<(), EngineError> {
        self.geometry.update(*cell)?;
        self.coulomb = self.coulomb_params.create(&self.geometry);
        self.ions
            .update(&self.geometry, &self.coulomb, &mut self.energies)?;
        trace!(
            pair = self.energies.pair,
            coulomb = self.energies.coulomb,
            "Ionic energies refreshed."
        );

        if mode == UpdateMode::Full {
            if let Some(electronic) = self.electronic.as_mut() {
                electronic.energy_and_gradient(&self.geometry, &mut self.energies)?;
                trace!(
                    electronic = self.energies.electronic,
                    "Electronic energy refreshed."
                );
            }
        }
        Ok(())
    }

    /// Recomputes ionic energies and forces at the current cell.
    pub fn refresh_ions(&mut self) -> Result<(), EngineError> {
        self.ions
            .update(&self.geometry, &self.coulomb, &mut self.energies)
    }

    pub fn free_energy(&self) -> f64 {
        self.energies.total()
    }

    pub fn energies(&self) -> &EnergyTerm {
        &self.energies
    }

    pub fn geometry(&self) -> &GeometryContext {
        &self.geometry
    }

    pub fn coulomb(&self) -> &CoulombOperator {
        &self.coulomb
    }

    pub fn coulomb_params(&self) -> &CoulombParams {
        &self.coulomb_params
    }

    pub fn ions(&self) -> &dyn IonicEnergyProvider {
        self.ions.as_ref()
    }

    pub fn ions_mut(&mut self) -> &mut dyn IonicEnergyProvider {
        self.ions.as_mut()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Ionic provider with `E = k (V - V0)^2` and no forces.
    pub(crate) struct VolumeQuadratic {
        pub target_volume: f64,
        pub stiffness: f64,
        pub positions: Vec<Vector3<f64>>,
        pub gradient: Vec<Vector3<f64>>,
        pub fixed: Vec<bool>,
        pub updates: Arc<AtomicUsize>,
    }

    impl VolumeQuadratic {
        pub(crate) fn new(target_volume: f64) -> Self {
            Self {
                target_volume,
                stiffness: 1.0,
                positions: vec![Vector3::zeros()],
                gradient: vec![Vector3::zeros()],
                fixed: vec![true],
                updates: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl IonicEnergyProvider for VolumeQuadratic {
        fn update(
            &mut self,
            geometry: &GeometryContext,
            _coulomb: &CoulombOperator,
            energies: &mut EnergyTerm,
        ) -> Result<(), EngineError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            let dv = geometry.volume() - self.target_volume;
            energies.pair = self.stiffness * dv * dv;
            energies.coulomb = 0.0;
            Ok(())
        }

        fn positions(&self) -> &[Vector3<f64>] {
            &self.positions
        }

        fn set_positions(&mut self, positions: &[Vector3<f64>]) {
            self.positions = positions.to_vec();
        }

        fn gradient(&self) -> &[Vector3<f64>] {
            &self.gradient
        }

        fn fixed(&self) -> &[bool] {
            &self.fixed
        }
    }

    struct ConstantElectronic {
        calls: Arc<AtomicUsize>,
    }

    impl ElectronicEnergyProvider for ConstantElectronic {
        fn energy_and_gradient(
            &mut self,
            _geometry: &GeometryContext,
            energies: &mut EnergyTerm,
        ) -> Result<(), EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            energies.electronic = -1.0;
            Ok(())
        }
    }

    pub(crate) fn volume_state(target_volume: f64) -> SimulationState {
        let geometry = GeometryContext::new(Matrix3::identity(), [4, 4, 4]).unwrap();
        let coulomb = CoulombParams {
            cutoff: 2.0,
            ..CoulombParams::default()
        };
        SimulationState::new(
            geometry,
            coulomb,
            Box::new(VolumeQuadratic::new(target_volume)),
        )
        .unwrap()
    }

    #[test]
    fn new_evaluates_starting_energy() {
        let state = volume_state(1.5);
        assert!((state.free_energy() - 0.25).abs() < 1e-12);
        assert_eq!(state.geometry().update_count(), 1);
    }

    #[test]
    fn propagate_updates_geometry_and_ionic_energy() {
        let mut state = volume_state(8.0);
        state
            .propagate(&Matrix3::from_diagonal_element(2.0), UpdateMode::Full)
            .unwrap();
        assert!((state.geometry().volume() - 8.0).abs() < 1e-12);
        assert!(state.free_energy().abs() < 1e-12);
        assert_eq!(state.geometry().sample_counts(), [4, 4, 4]);
    }

    #[test]
    fn skip_electronic_leaves_electronic_term_untouched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut state = volume_state(1.0)
            .with_electronic(Box::new(ConstantElectronic {
                calls: Arc::clone(&calls),
            }))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let cell = Matrix3::from_diagonal_element(1.1);
        state.propagate(&cell, UpdateMode::SkipElectronic).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        state.propagate(&cell, UpdateMode::Full).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.energies().electronic, -1.0);
    }

    #[test]
    fn propagate_rejects_degenerate_cell() {
        let mut state = volume_state(1.0);
        let err = state
            .propagate(&Matrix3::zeros(), UpdateMode::Full)
            .unwrap_err();
        assert!(matches!(err, EngineError::Geometry { .. }));
    }
}
