use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileMinimizeConfig};
use super::models::AppConfig;
use crate::cli::SettingsArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use cellrelax::engine::config as core_config;
use cellrelax::engine::minimize::DirectionUpdate;
use nalgebra::Vector3;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Merges defaults, the config file, `--set` overrides and dedicated flags, in
/// increasing order of precedence.
pub fn build_config(
    settings: &SettingsArgs,
    input: &Path,
    output: Option<&Path>,
    trajectory: Option<&Path>,
) -> Result<AppConfig> {
    let core_config = build_core_config(settings)?;
    Ok(AppConfig {
        input_path: input.to_path_buf(),
        output_path: output.map(Path::to_path_buf),
        trajectory_path: trajectory.map(Path::to_path_buf),
        core_config,
    })
}

pub fn build_core_config(settings: &SettingsArgs) -> Result<core_config::RelaxConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &settings.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &settings.set_values)?;

    let mut lattice_file = file_config.lattice.take().unwrap_or_default();
    let move_scale = settings
        .move_scale
        .or(lattice_file.move_scale)
        .unwrap_or(defaults.move_scale);
    let max_allowed_strain = settings
        .max_strain
        .or(lattice_file.max_allowed_strain)
        .unwrap_or(defaults.max_allowed_strain);
    let fd_step = settings
        .fd_step
        .or(lattice_file.fd_step)
        .unwrap_or(defaults.fd_step);
    let probe_relaxation = lattice_file
        .probe_relaxation
        .unwrap_or(defaults.probe_relaxation);

    let lattice_minimize = lattice_file
        .minimize
        .take()
        .unwrap_or_default()
        .merge_into(defaults.lattice_minimize);
    let ionic_minimize = file_config
        .ionic
        .take()
        .and_then(|ionic| ionic.minimize)
        .unwrap_or_default()
        .merge_into(defaults.ionic_minimize);
    let coulomb = file_config
        .coulomb
        .take()
        .unwrap_or_default()
        .merge_into(defaults.coulomb);

    core_config::RelaxConfigBuilder::new()
        .move_scale(Vector3::from(move_scale))
        .max_allowed_strain(max_allowed_strain)
        .fd_step(fd_step)
        .probe_relaxation(probe_relaxation)
        .lattice_minimize(lattice_minimize)
        .ionic_minimize(ionic_minimize)
        .coulomb(coulomb)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn parse_bool_triplet(key: &str, value: &str) -> Result<[bool; 3]> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(CliError::Config(format!(
            "Invalid value for {}: '{}'. Expected three comma-separated booleans.",
            key, value
        )));
    };
    Ok([
        parse_value(key, a, "boolean")?,
        parse_value(key, b, "boolean")?,
        parse_value(key, c, "boolean")?,
    ])
}

fn apply_minimize_key(
    config: &mut FileMinimizeConfig,
    field: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    match field {
        "n-iterations" => config.n_iterations = Some(parse_value(key, value, "integer")?),
        "knorm-threshold" => config.knorm_threshold = Some(parse_value(key, value, "float")?),
        "energy-diff-threshold" => {
            config.energy_diff_threshold = Some(parse_value(key, value, "float")?)
        }
        "n-energy-diff" => config.n_energy_diff = Some(parse_value(key, value, "integer")?),
        "dir-update" => {
            config.dir_update = Some(match value {
                "steepest-descent" => DirectionUpdate::SteepestDescent,
                "polak-ribiere" => DirectionUpdate::PolakRibiere,
                "fletcher-reeves" => DirectionUpdate::FletcherReeves,
                "hestenes-stiefel" => DirectionUpdate::HestenesStiefel,
                _ => {
                    return Err(CliError::Config(format!(
                        "Invalid direction update for {}: {}",
                        key, value
                    )));
                }
            })
        }
        "alpha-t-start" => config.alpha_t_start = Some(parse_value(key, value, "float")?),
        "alpha-t-min" => config.alpha_t_min = Some(parse_value(key, value, "float")?),
        "alpha-t-reduce-factor" => {
            config.alpha_t_reduce_factor = Some(parse_value(key, value, "float")?)
        }
        "alpha-t-increase-factor" => {
            config.alpha_t_increase_factor = Some(parse_value(key, value, "float")?)
        }
        "n-alpha-adjust-max" => {
            config.n_alpha_adjust_max = Some(parse_value(key, value, "integer")?)
        }
        "update-test-step-size" => {
            config.update_test_step_size = Some(parse_value(key, value, "boolean")?)
        }
        "fd-test" => config.fd_test = Some(parse_value(key, value, "boolean")?),
        _ => return Err(unsupported_key(key)),
    }
    Ok(())
}

fn unsupported_key(key: &str) -> CliError {
    CliError::Config(format!(
        "Unsupported configuration key for --set: '{}'",
        key
    ))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = parser::split_key_value(kv_pair).ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;

        if let Some(field) = key.strip_prefix("lattice.minimize.") {
            let lattice = config.lattice.get_or_insert_with(Default::default);
            let minimize = lattice.minimize.get_or_insert_with(Default::default);
            apply_minimize_key(minimize, field, key, value)?;
            continue;
        }
        if let Some(field) = key.strip_prefix("ionic.minimize.") {
            let ionic = config.ionic.get_or_insert_with(Default::default);
            let minimize = ionic.minimize.get_or_insert_with(Default::default);
            apply_minimize_key(minimize, field, key, value)?;
            continue;
        }

        match key {
            "lattice.move-scale" => {
                config
                    .lattice
                    .get_or_insert_with(Default::default)
                    .move_scale = Some(
                    parser::parse_triplet(value).map_err(|e| CliError::Config(e.to_string()))?,
                );
            }
            "lattice.max-allowed-strain" => {
                config
                    .lattice
                    .get_or_insert_with(Default::default)
                    .max_allowed_strain = Some(parse_value(key, value, "float")?);
            }
            "lattice.fd-step" => {
                config.lattice.get_or_insert_with(Default::default).fd_step =
                    Some(parse_value(key, value, "float")?);
            }
            "lattice.probe-relaxation" => {
                let relaxation = match value {
                    "relaxed" => core_config::ProbeRelaxation::Relaxed,
                    "frozen" => core_config::ProbeRelaxation::Frozen,
                    _ => {
                        return Err(CliError::Config(format!(
                            "Invalid value for {}: '{}'. Expected 'relaxed' or 'frozen'.",
                            key, value
                        )));
                    }
                };
                config
                    .lattice
                    .get_or_insert_with(Default::default)
                    .probe_relaxation = Some(relaxation);
            }
            "coulomb.cutoff" => {
                config.coulomb.get_or_insert_with(Default::default).cutoff =
                    Some(parse_value(key, value, "float")?);
            }
            "coulomb.dielectric" => {
                config.coulomb.get_or_insert_with(Default::default).dielectric =
                    Some(parse_value(key, value, "float")?);
            }
            "coulomb.truncated" => {
                config.coulomb.get_or_insert_with(Default::default).truncated =
                    Some(parse_bool_triplet(key, value)?);
            }
            _ => return Err(unsupported_key(key)),
        }
    }
    Ok(config)
}

/// Falls back to `<stem>-relaxed.toml` beside the input.
pub fn resolve_output(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "structure".to_string());
            input.with_file_name(format!("{}-relaxed.toml", stem))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellrelax::engine::config::ProbeRelaxation;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let cfg = build_core_config(&SettingsArgs::default()).unwrap();
        let defaults = DefaultsConfig::default();

        assert_eq!(cfg.lattice.move_scale, Vector3::from(defaults.move_scale));
        assert_eq!(cfg.lattice.max_allowed_strain, defaults.max_allowed_strain);
        assert_eq!(cfg.lattice.fd_step, defaults.fd_step);
        assert_eq!(cfg.lattice.probe_relaxation, ProbeRelaxation::Relaxed);
        assert_eq!(cfg.lattice.minimize.label, "LatticeMinimize");
        assert_eq!(cfg.ionic.label, "IonicMinimize");
        assert_eq!(cfg.coulomb, defaults.coulomb);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [lattice]
            max-allowed-strain = 0.2
            probe-relaxation = "frozen"

            [lattice.minimize]
            n-iterations = 8
            dir-update = "steepest-descent"

            [ionic.minimize]
            n-iterations = 3

            [coulomb]
            cutoff = 6.5
            "#,
        );
        let settings = SettingsArgs {
            config: Some(path),
            ..SettingsArgs::default()
        };
        let cfg = build_core_config(&settings).unwrap();

        assert_eq!(cfg.lattice.max_allowed_strain, 0.2);
        assert_eq!(cfg.lattice.probe_relaxation, ProbeRelaxation::Frozen);
        assert_eq!(cfg.lattice.minimize.n_iterations, 8);
        assert_eq!(
            cfg.lattice.minimize.dir_update,
            DirectionUpdate::SteepestDescent
        );
        assert_eq!(cfg.ionic.n_iterations, 3);
        assert_eq!(cfg.coulomb.cutoff, 6.5);
        assert_eq!(cfg.coulomb.dielectric, 1.0);
    }

    #[test]
    fn flags_override_set_values_which_override_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[lattice]\nmax-allowed-strain = 0.2\nfd-step = 1e-4\n",
        );
        let settings = SettingsArgs {
            config: Some(path),
            max_strain: Some(0.3),
            set_values: vec![
                "lattice.max-allowed-strain=0.25".to_string(),
                "lattice.fd-step=2e-5".to_string(),
                "ionic.minimize.alpha-t-start=0.5".to_string(),
            ],
            ..SettingsArgs::default()
        };
        let cfg = build_core_config(&settings).unwrap();

        assert_eq!(cfg.lattice.max_allowed_strain, 0.3);
        assert_eq!(cfg.lattice.fd_step, 2e-5);
        assert_eq!(cfg.ionic.alpha_t_start, 0.5);
    }

    #[test]
    fn set_values_parse_triplets_and_truncation() {
        let settings = SettingsArgs {
            set_values: vec![
                "lattice.move-scale=1,1,0".to_string(),
                "coulomb.truncated=false,false,true".to_string(),
                "lattice.minimize.dir-update=hestenes-stiefel".to_string(),
            ],
            ..SettingsArgs::default()
        };
        let cfg = build_core_config(&settings).unwrap();

        assert_eq!(cfg.lattice.move_scale, Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(cfg.coulomb.truncated, [false, false, true]);
        assert_eq!(
            cfg.lattice.minimize.dir_update,
            DirectionUpdate::HestenesStiefel
        );
    }

    #[test]
    fn unsupported_or_malformed_set_values_are_errors() {
        for bad in ["lattice.unknown=1", "lattice.fd-step", "coulomb.cutoff=abc"] {
            let settings = SettingsArgs {
                set_values: vec![bad.to_string()],
                ..SettingsArgs::default()
            };
            assert!(
                matches!(build_core_config(&settings), Err(CliError::Config(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn invalid_merged_values_fail_validation() {
        let settings = SettingsArgs {
            fd_step: Some(-1.0),
            ..SettingsArgs::default()
        };
        assert!(matches!(
            build_core_config(&settings),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[lattice\n");
        let settings = SettingsArgs {
            config: Some(path.clone()),
            ..SettingsArgs::default()
        };
        match build_core_config(&settings) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn output_defaults_next_to_input() {
        assert_eq!(
            resolve_output(Path::new("data/nacl.toml"), None),
            PathBuf::from("data/nacl-relaxed.toml")
        );
        assert_eq!(
            resolve_output(Path::new("nacl.toml"), Some(Path::new("out.toml"))),
            PathBuf::from("out.toml")
        );
    }
}
