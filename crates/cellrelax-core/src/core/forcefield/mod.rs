//! Reference classical-ion backend.
//!
//! Pair potentials (Lennard-Jones 12-6 and Buckingham exp-6) and shifted-force
//! electrostatics summed over the periodic images of the current cell. The
//! [`coulomb::CoulombParams`] factory builds a fresh [`coulomb::CoulombOperator`]
//! for every cell shape; [`scoring::PeriodicScorer`] turns fractional ionic
//! positions into an [`term::EnergyTerm`] and a fractional-coordinate gradient.

pub mod coulomb;
pub mod params;
pub mod potentials;
pub mod scoring;
pub mod term;
