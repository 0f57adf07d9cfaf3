//! # cellrelax Core Library
//!
//! Equilibrium shapes of periodic simulation cells: minimizes the free energy
//! over the symmetric strain tensor while honouring the crystal point group and
//! any non-periodic directions, relaxing the ions at every trial cell.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Atom`),
//!   lattice geometry and symmetry groups, the pair-potential and Coulomb
//!   forcefield, and TOML structure I/O.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. It owns the
//!   lattice-dependent `SimulationState`, the symmetry-adapted `StrainBasis`,
//!   finite-difference stress evaluation, the nested ionic relaxer and the
//!   generic conjugate-gradient driver that runs both minimizations.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as a full
//!   cell relaxation, with progress reporting and rollback on failure.

pub mod core;
pub mod engine;
pub mod workflows;
