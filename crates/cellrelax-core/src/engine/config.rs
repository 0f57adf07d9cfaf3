use super::minimize::MinimizeParams;
use crate::core::forcefield::coulomb::CoulombParams;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Whether stress probes relax the ions at each probe cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeRelaxation {
    #[default]
    Relaxed,
    /// Keeps fractional positions fixed: the clamped-ion stress.
    Frozen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatticeMinimizeConfig {
    /// Per-axis diagonal conditioner. Zero freezes an axis.
    pub move_scale: Vector3<f64>,
    /// Frobenius norm of the strain above which a trial cell is refused.
    pub max_allowed_strain: f64,
    pub fd_step: f64,
    pub probe_relaxation: ProbeRelaxation,
    pub minimize: MinimizeParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxConfig {
    pub lattice: LatticeMinimizeConfig,
    pub ionic: MinimizeParams,
    pub coulomb: CoulombParams,
}

#[derive(Default)]
pub struct RelaxConfigBuilder {
    move_scale: Option<Vector3<f64>>,
    max_allowed_strain: Option<f64>,
    fd_step: Option<f64>,
    probe_relaxation: Option<ProbeRelaxation>,
    lattice_minimize: Option<MinimizeParams>,
    ionic_minimize: Option<MinimizeParams>,
    coulomb: Option<CoulombParams>,
}

impl RelaxConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_scale(mut self, scale: Vector3<f64>) -> Self {
        self.move_scale = Some(scale);
        self
    }
    pub fn max_allowed_strain(mut self, strain: f64) -> Self {
        self.max_allowed_strain = Some(strain);
        self
    }
    pub fn fd_step(mut self, step: f64) -> Self {
        self.fd_step = Some(step);
        self
    }
    pub fn probe_relaxation(mut self, relaxation: ProbeRelaxation) -> Self {
        self.probe_relaxation = Some(relaxation);
        self
    }
    pub fn lattice_minimize(mut self, params: MinimizeParams) -> Self {
        self.lattice_minimize = Some(params);
        self
    }
    pub fn ionic_minimize(mut self, params: MinimizeParams) -> Self {
        self.ionic_minimize = Some(params);
        self
    }
    pub fn coulomb(mut self, params: CoulombParams) -> Self {
        self.coulomb = Some(params);
        self
    }

    /// Probe relaxation and Coulomb settings fall back to their defaults;
    /// everything else is required.
    pub fn build(self) -> Result<RelaxConfig, ConfigError> {
        let lattice = LatticeMinimizeConfig {
            move_scale: self
                .move_scale
                .ok_or(ConfigError::MissingParameter("move_scale"))?,
            max_allowed_strain: self
                .max_allowed_strain
                .ok_or(ConfigError::MissingParameter("max_allowed_strain"))?,
            fd_step: self.fd_step.ok_or(ConfigError::MissingParameter("fd_step"))?,
            probe_relaxation: self.probe_relaxation.unwrap_or_default(),
            minimize: self
                .lattice_minimize
                .ok_or(ConfigError::MissingParameter("lattice_minimize"))?,
        };
        let config = RelaxConfig {
            lattice,
            ionic: self
                .ionic_minimize
                .ok_or(ConfigError::MissingParameter("ionic_minimize"))?,
            coulomb: self.coulomb.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl RelaxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lattice = &self.lattice;
        if lattice.move_scale.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(invalid("move_scale", "every component must be finite and non-negative"));
        }
        positive("max_allowed_strain", lattice.max_allowed_strain)?;
        positive("fd_step", lattice.fd_step)?;
        positive("coulomb.cutoff", self.coulomb.cutoff)?;
        positive("coulomb.dielectric", self.coulomb.dielectric)?;
        validate_minimize("lattice_minimize", &lattice.minimize)?;
        validate_minimize("ionic_minimize", &self.ionic)
    }
}

fn validate_minimize(name: &'static str, params: &MinimizeParams) -> Result<(), ConfigError> {
    if !(params.alpha_t_start.is_finite() && params.alpha_t_start > 0.0) {
        return Err(invalid(name, "alpha_t_start must be positive"));
    }
    if params.alpha_t_min < 0.0 || params.alpha_t_min > params.alpha_t_start {
        return Err(invalid(name, "alpha_t_min must lie in [0, alpha_t_start]"));
    }
    if !(params.alpha_t_reduce_factor > 0.0 && params.alpha_t_reduce_factor < 1.0) {
        return Err(invalid(name, "alpha_t_reduce_factor must lie in (0, 1)"));
    }
    if params.alpha_t_increase_factor <= 1.0 {
        return Err(invalid(name, "alpha_t_increase_factor must exceed 1"));
    }
    Ok(())
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("must be positive, got {value}")))
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> RelaxConfigBuilder {
        RelaxConfigBuilder::new()
            .move_scale(Vector3::new(1.0, 1.0, 1.0))
            .max_allowed_strain(0.5)
            .fd_step(1e-5)
            .lattice_minimize(MinimizeParams::default())
            .ionic_minimize(MinimizeParams::default())
    }

    #[test]
    fn build_succeeds_with_defaults_for_optional_sections() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.lattice.probe_relaxation, ProbeRelaxation::Relaxed);
        assert_eq!(config.coulomb, CoulombParams::default());
        assert_eq!(config.lattice.max_allowed_strain, 0.5);
    }

    #[test]
    fn build_fails_on_missing_required_parameter() {
        let result = RelaxConfigBuilder::new()
            .move_scale(Vector3::new(1.0, 1.0, 1.0))
            .max_allowed_strain(0.5)
            .lattice_minimize(MinimizeParams::default())
            .ionic_minimize(MinimizeParams::default())
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("fd_step"));
    }

    #[test]
    fn build_rejects_negative_move_scale() {
        let err = complete_builder()
            .move_scale(Vector3::new(1.0, -1.0, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "move_scale",
                ..
            }
        ));
    }

    #[test]
    fn build_rejects_non_positive_fd_step() {
        let err = complete_builder().fd_step(0.0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { name: "fd_step", .. }));
    }

    #[test]
    fn build_rejects_bad_line_search_factors() {
        let params = MinimizeParams {
            alpha_t_reduce_factor: 1.5,
            ..MinimizeParams::default()
        };
        let err = complete_builder().ionic_minimize(params).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "ionic_minimize",
                ..
            }
        ));
    }

    #[test]
    fn probe_relaxation_deserializes_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ProbeRelaxation,
        }
        let wrapper: Wrapper = toml::from_str("mode = \"frozen\"").unwrap();
        assert_eq!(wrapper.mode, ProbeRelaxation::Frozen);
    }
}
