//! Data model of a periodic crystal: fractional-coordinate ions in a cell.

pub mod atom;
pub mod structure;
