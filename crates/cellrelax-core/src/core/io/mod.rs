//! Reading and writing crystal structure files.
//!
//! [`traits::StructureFile`] is the format-independent interface;
//! [`toml_structure::TomlStructure`] implements it for the TOML layout used by
//! the command-line tool.

pub mod toml_structure;
pub mod traits;
