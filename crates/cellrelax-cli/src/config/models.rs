use cellrelax::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub trajectory_path: Option<PathBuf>,
    pub core_config: core_config::RelaxConfig,
}
