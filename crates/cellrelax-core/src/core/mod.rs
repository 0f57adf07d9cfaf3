//! # Core Module
//!
//! Stateless building blocks of the lattice relaxation: tensor algebra, the
//! cell geometry and its point group, the crystal data model, file I/O and the
//! reference classical-ion force field.
//!
//! - **Tensor math** ([`math`]) - Frobenius products and exact integer matrix algebra
//! - **Lattice** ([`lattice`]) - Cell-derived geometry and symmetry groups
//! - **Crystal representation** ([`models`]) - Atoms in fractional coordinates and structures
//! - **Energy calculations** ([`forcefield`]) - Pair potentials, electrostatics and scoring
//! - **File I/O** ([`io`]) - TOML structure files

pub mod forcefield;
pub mod io;
pub mod lattice;
pub mod math;
pub mod models;
