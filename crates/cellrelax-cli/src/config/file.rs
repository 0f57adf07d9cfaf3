use crate::error::{CliError, Result};
use cellrelax::core::forcefield::coulomb::CoulombParams;
use cellrelax::engine::config::ProbeRelaxation;
use cellrelax::engine::minimize::{DirectionUpdate, MinimizeParams};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Optional overrides for one conjugate-gradient run.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMinimizeConfig {
    pub n_iterations: Option<usize>,
    pub knorm_threshold: Option<f64>,
    pub energy_diff_threshold: Option<f64>,
    pub n_energy_diff: Option<usize>,
    pub dir_update: Option<DirectionUpdate>,
    pub alpha_t_start: Option<f64>,
    pub alpha_t_min: Option<f64>,
    pub alpha_t_reduce_factor: Option<f64>,
    pub alpha_t_increase_factor: Option<f64>,
    pub n_alpha_adjust_max: Option<usize>,
    pub update_test_step_size: Option<bool>,
    pub fd_test: Option<bool>,
}

impl FileMinimizeConfig {
    /// Overlays the values present in the file onto `base`.
    pub fn merge_into(self, base: MinimizeParams) -> MinimizeParams {
        MinimizeParams {
            n_iterations: self.n_iterations.unwrap_or(base.n_iterations),
            knorm_threshold: self.knorm_threshold.unwrap_or(base.knorm_threshold),
            energy_diff_threshold: self
                .energy_diff_threshold
                .unwrap_or(base.energy_diff_threshold),
            n_energy_diff: self.n_energy_diff.unwrap_or(base.n_energy_diff),
            dir_update: self.dir_update.unwrap_or(base.dir_update),
            alpha_t_start: self.alpha_t_start.unwrap_or(base.alpha_t_start),
            alpha_t_min: self.alpha_t_min.unwrap_or(base.alpha_t_min),
            alpha_t_reduce_factor: self
                .alpha_t_reduce_factor
                .unwrap_or(base.alpha_t_reduce_factor),
            alpha_t_increase_factor: self
                .alpha_t_increase_factor
                .unwrap_or(base.alpha_t_increase_factor),
            n_alpha_adjust_max: self.n_alpha_adjust_max.unwrap_or(base.n_alpha_adjust_max),
            update_test_step_size: self
                .update_test_step_size
                .unwrap_or(base.update_test_step_size),
            fd_test: self.fd_test.unwrap_or(base.fd_test),
            label: base.label,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLatticeConfig {
    pub move_scale: Option<[f64; 3]>,
    pub max_allowed_strain: Option<f64>,
    pub fd_step: Option<f64>,
    pub probe_relaxation: Option<ProbeRelaxation>,
    pub minimize: Option<FileMinimizeConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileIonicConfig {
    pub minimize: Option<FileMinimizeConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCoulombConfig {
    pub truncated: Option<[bool; 3]>,
    pub cutoff: Option<f64>,
    pub dielectric: Option<f64>,
}

impl FileCoulombConfig {
    pub fn merge_into(self, base: CoulombParams) -> CoulombParams {
        CoulombParams {
            truncated: self.truncated.unwrap_or(base.truncated),
            cutoff: self.cutoff.unwrap_or(base.cutoff),
            dielectric: self.dielectric.unwrap_or(base.dielectric),
        }
    }
}

/// The on-disk layout of a `cellrelax` configuration file.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub lattice: Option<FileLatticeConfig>,
    pub ionic: Option<FileIonicConfig>,
    pub coulomb: Option<FileCoulombConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
