use thiserror::Error;

use super::config::ConfigError;
use super::strain_basis::BasisError;
use crate::core::forcefield::scoring::ScoringError;
use crate::core::lattice::geometry::GeometryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Invalid strain basis configuration: {source}")]
    Basis {
        #[from]
        source: BasisError,
    },

    #[error("Energy scoring failed: {source}")]
    Scoring {
        #[from]
        source: ScoringError,
    },

    #[error("Lattice update failed: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Energy provider '{provider}' failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Dump hook failed: {0}")]
    Dump(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
