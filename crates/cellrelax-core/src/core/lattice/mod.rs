//! # Lattice Module
//!
//! Cell geometry and crystal symmetry.
//!
//! - [`geometry`] - `GeometryContext`, every quantity derived from the lattice vectors
//!   (reciprocal lattice, metric, volume, grid sample spacing)
//! - [`symmetry`] - integer point-group operations in lattice coordinates and the
//!   `SymmetryProvider` seam used by the strain-basis construction

pub mod geometry;
pub mod symmetry;
