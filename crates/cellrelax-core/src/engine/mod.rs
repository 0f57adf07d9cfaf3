//! # Engine Module
//!
//! The stateful layer: everything that changes while a cell is being relaxed.
//!
//! ## Overview
//!
//! [`lattice_minimizer::LatticeMinimizer`] exposes the strain of the cell to the
//! generic conjugate-gradient driver in [`minimize`]. Every trial strain is
//! pushed through [`state::SimulationState::propagate`] into the geometry, the
//! Coulomb operator and the ionic energy tables, after which the ions are
//! relaxed at that cell by an [`ionic_minimizer::IonicRelaxer`]. Gradients
//! with respect to the strain come from finite-difference probes in
//! [`stress`], projected onto the symmetry-adapted [`strain_basis`].
//!
//! ## Architecture
//!
//! - **Driver** ([`minimize`]) - Domain-agnostic CG with quadratic line minimization
//! - **Strain space** ([`strain_basis`], [`lattice_state`]) - Feasible strains and the current cell
//! - **Dependent state** ([`state`], [`providers`]) - Lattice-dependent subsystems and their collaborators
//! - **Nested relaxation** ([`ionic_minimizer`]) - Ionic positions at fixed cell
//! - **Stress** ([`stress`]) - Fourth-order central differences along basis directions
//! - **Reporting** ([`dump`], [`progress`]) - Per-iteration hooks and progress events
//! - **Configuration** ([`config`]) and **Error Handling** ([`error`])

pub mod config;
pub mod dump;
pub mod error;
pub mod ionic_minimizer;
pub mod lattice_minimizer;
pub mod lattice_state;
pub mod minimize;
pub mod progress;
pub mod providers;
pub mod state;
pub mod strain_basis;
pub mod stress;
