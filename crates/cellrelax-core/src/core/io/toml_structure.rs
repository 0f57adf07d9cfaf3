use super::traits::StructureFile;
use crate::core::forcefield::params::Species;
use crate::core::lattice::symmetry::{SymmetryGroup, SymmetryMatrix, SymmetryProvider};
use crate::core::models::atom::Atom;
use crate::core::models::structure::Structure;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TomlStructureError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AtomRecord {
    species: String,
    position: [f64; 3],
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    fixed: bool,
}

/// On-disk layout. `lattice` lists the three lattice vectors; symmetry
/// matrices are written row by row.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct StructureRecord {
    lattice: [[f64; 3]; 3],
    #[serde(default = "default_sample_counts")]
    sample_counts: [usize; 3],
    #[serde(default)]
    symmetries: Vec<[[i32; 3]; 3]>,
    #[serde(default)]
    species: Vec<Species>,
    #[serde(default)]
    atoms: Vec<AtomRecord>,
}

fn default_sample_counts() -> [usize; 3] {
    [1, 1, 1]
}

/// TOML crystal structure format.
///
/// ```toml
/// lattice = [[5.64, 0.0, 0.0], [0.0, 5.64, 0.0], [0.0, 0.0, 5.64]]
/// sample-counts = [24, 24, 24]
///
/// [[species]]
/// name = "Na"
/// charge = 1.0
/// vdw = { radius = 2.6, well-depth = 0.01 }
///
/// [[atoms]]
/// species = "Na"
/// position = [0.0, 0.0, 0.0]
/// ```
pub struct TomlStructure;

impl TomlStructure {
    pub fn read_from_str(content: &str) -> Result<Structure, TomlStructureError> {
        let record: StructureRecord = toml::from_str(content)?;
        record.into_structure()
    }

    pub fn write_to_string(structure: &Structure) -> Result<String, TomlStructureError> {
        Ok(toml::to_string(&StructureRecord::from_structure(structure))?)
    }
}

impl StructureRecord {
    fn into_structure(self) -> Result<Structure, TomlStructureError> {
        let lattice = Matrix3::from_fn(|i, k| self.lattice[k][i]);

        for atom in &self.atoms {
            if !self.species.iter().any(|s| s.name == atom.species) {
                return Err(TomlStructureError::Inconsistency(format!(
                    "atom refers to undeclared species '{}'",
                    atom.species
                )));
            }
        }
        if let Some(dup) = self
            .species
            .iter()
            .enumerate()
            .find(|(i, s)| self.species[..*i].iter().any(|t| t.name == s.name))
        {
            return Err(TomlStructureError::Inconsistency(format!(
                "species '{}' is declared twice",
                dup.1.name
            )));
        }

        let symmetries = SymmetryGroup::new(
            self.symmetries
                .iter()
                .map(|rows| SymmetryMatrix::from_fn(|i, j| rows[i][j]))
                .collect(),
        );
        let atoms = self
            .atoms
            .into_iter()
            .map(|record| Atom {
                species: record.species,
                position: Vector3::from(record.position),
                fixed: record.fixed,
            })
            .collect();

        Ok(Structure::new(lattice, self.species, atoms)
            .with_symmetries(symmetries)
            .with_sample_counts(self.sample_counts))
    }

    fn from_structure(structure: &Structure) -> Self {
        let r = &structure.lattice;
        Self {
            lattice: [0, 1, 2].map(|k| [r[(0, k)], r[(1, k)], r[(2, k)]]),
            sample_counts: structure.sample_counts,
            symmetries: structure
                .symmetries
                .matrices()
                .iter()
                .map(|m| [0, 1, 2].map(|i| [m[(i, 0)], m[(i, 1)], m[(i, 2)]]))
                .collect(),
            species: structure.species.clone(),
            atoms: structure
                .atoms
                .iter()
                .map(|atom| AtomRecord {
                    species: atom.species.clone(),
                    position: [atom.position.x, atom.position.y, atom.position.z],
                    fixed: atom.fixed,
                })
                .collect(),
        }
    }
}

impl StructureFile for TomlStructure {
    type Error = TomlStructureError;

    fn read_from(reader: &mut impl BufRead) -> Result<Structure, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::read_from_str(&content)
    }

    fn write_to(structure: &Structure, writer: &mut impl Write) -> Result<(), Self::Error> {
        writer.write_all(Self::write_to_string(structure)?.as_bytes())?;
        Ok(())
    }
}
