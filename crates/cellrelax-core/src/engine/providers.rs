use super::error::EngineError;
use crate::core::forcefield::coulomb::CoulombOperator;
use crate::core::forcefield::scoring::{PeriodicScorer, ScoringError};
use crate::core::forcefield::term::EnergyTerm;
use crate::core::lattice::geometry::GeometryContext;
use crate::core::models::structure::Structure;
use nalgebra::Vector3;

/// Ionic energy tables and forces that depend on the cell shape.
///
/// Positions are fractional; the gradient is taken with respect to them.
pub trait IonicEnergyProvider {
    /// Recomputes ionic energies and forces for the current cell and writes
    /// the ionic components of `energies`.
    fn update(
        &mut self,
        geometry: &GeometryContext,
        coulomb: &CoulombOperator,
        energies: &mut EnergyTerm,
    ) -> Result<(), EngineError>;

    fn positions(&self) -> &[Vector3<f64>];

    fn set_positions(&mut self, positions: &[Vector3<f64>]);

    /// `∂E/∂x` per atom from the last [`IonicEnergyProvider::update`].
    fn gradient(&self) -> &[Vector3<f64>];

    fn fixed(&self) -> &[bool];
}

/// Electronic energy and gradient at fixed electronic state. Optional.
pub trait ElectronicEnergyProvider {
    fn energy_and_gradient(
        &mut self,
        geometry: &GeometryContext,
        energies: &mut EnergyTerm,
    ) -> Result<(), EngineError>;
}

/// Classical ions scored by pair potentials and shifted-force electrostatics.
#[derive(Debug, Clone)]
pub struct PeriodicIons {
    scorer: PeriodicScorer,
    kinds: Vec<usize>,
    positions: Vec<Vector3<f64>>,
    fixed: Vec<bool>,
    gradient: Vec<Vector3<f64>>,
}

impl PeriodicIons {
    pub fn from_structure(structure: &Structure) -> Result<Self, ScoringError> {
        let scorer = PeriodicScorer::new(structure.species.clone());
        let kinds = structure
            .atoms
            .iter()
            .map(|atom| scorer.species_index(&atom.species))
            .collect::<Result<Vec<_>, _>>()?;
        let positions = structure.positions();
        Ok(Self {
            gradient: vec![Vector3::zeros(); positions.len()],
            scorer,
            kinds,
            positions,
            fixed: structure.fixed_mask(),
        })
    }
}

impl IonicEnergyProvider for PeriodicIons {
    fn update(
        &mut self,
        geometry: &GeometryContext,
        coulomb: &CoulombOperator,
        energies: &mut EnergyTerm,
    ) -> Result<(), EngineError> {
        let scored = self
            .scorer
            .score(&self.kinds, &self.positions, geometry, coulomb)?;
        energies.pair = scored.energy.pair;
        energies.coulomb = scored.energy.coulomb;
        self.gradient = scored.gradient;
        Ok(())
    }

    fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    fn set_positions(&mut self, positions: &[Vector3<f64>]) {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
    }

    fn gradient(&self) -> &[Vector3<f64>] {
        &self.gradient
    }

    fn fixed(&self) -> &[bool] {
        &self.fixed
    }
}
