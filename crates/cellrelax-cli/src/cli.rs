use crate::utils::parser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "cellrelax CLI - Symmetry-constrained lattice strain minimization with nested ionic relaxation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel energy evaluation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Relax the cell shape and ionic positions of a periodic structure.
    Relax(RelaxArgs),
    /// Print the symmetry-adapted strain basis without evaluating any energies.
    Basis(BasisArgs),
}

/// Configuration sources shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `lattice.max-allowed-strain`: the strain norm above which a trial cell is refused.
    #[arg(long = "max-strain", value_name = "FLOAT")]
    pub max_strain: Option<f64>,

    /// Override `lattice.fd-step`: the strain step of the stress finite differences.
    #[arg(long, value_name = "FLOAT")]
    pub fd_step: Option<f64>,

    /// Override `lattice.move-scale` with three comma-separated values. Zero freezes an axis.
    #[arg(long, value_name = "A,B,C", value_parser = parser::parse_triplet)]
    pub move_scale: Option<[f64; 3]>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S lattice.minimize.n-iterations=20
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `relax` subcommand.
#[derive(Args, Debug)]
pub struct RelaxArgs {
    /// Path to the input structure file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the relaxed output structure (TOML).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the per-iteration lattice trajectory to this path (TOML).
    #[arg(long, value_name = "PATH")]
    pub trajectory: Option<PathBuf>,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Arguments for the `basis` subcommand.
#[derive(Args, Debug)]
pub struct BasisArgs {
    /// Path to the input structure file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    #[command(flatten)]
    pub settings: SettingsArgs,
}
