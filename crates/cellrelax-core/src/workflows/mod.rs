//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::core`] data models and the
//! [`crate::engine`] together into complete procedures.
//!
//! - **Relaxation** ([`relax`]) - Loads the structure into a simulation state,
//!   minimizes the cell strain with nested ionic relaxation and rolls back on
//!   failure.
//! - **Basis inspection** ([`basis`]) - Reports the symmetry-adapted strain
//!   basis a relaxation would use, without evaluating energies.

pub mod basis;
pub mod relax;
