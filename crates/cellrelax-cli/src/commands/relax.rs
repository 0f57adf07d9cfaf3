use crate::cli::RelaxArgs;
use crate::config::{self, AppConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use cellrelax::{
    core::io::{toml_structure::TomlStructure, traits::StructureFile},
    core::math::tensor::format_rows,
    engine::dump::LatticeTrajectory,
    engine::progress::ProgressReporter,
    workflows::{self, relax::RelaxResult},
};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: RelaxArgs) -> Result<()> {
    info!("Building configuration from defaults, file and CLI arguments...");
    let app_config = config::build_config(
        &args.settings,
        &args.input,
        args.output.as_deref(),
        args.trajectory.as_deref(),
    )?;

    let AppConfig {
        input_path,
        output_path,
        trajectory_path,
        core_config,
    } = app_config;

    info!("Loading input structure from {:?}", &input_path);
    let structure =
        TomlStructure::read_from_path(&input_path).map_err(|e| CliError::FileParsing {
            path: input_path.clone(),
            source: e.into(),
        })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting lattice relaxation...");
    info!("Invoking the core relaxation workflow...");
    let result = workflows::relax::run(&structure, &core_config, &reporter)?;

    print_summary(&result);

    let output_path = config::resolve_output(&input_path, output_path.as_deref());
    info!("Writing relaxed structure to {:?}", &output_path);
    TomlStructure::write_to_path(&result.structure, &output_path).map_err(|e| {
        CliError::FileWriting {
            path: output_path.clone(),
            source: e.into(),
        }
    })?;
    println!("✓ Relaxed structure written to: {}", output_path.display());

    if let Some(path) = trajectory_path {
        write_trajectory(&result.trajectory, &path)?;
        println!(
            "✓ Trajectory ({} frames) written to: {}",
            result.trajectory.len(),
            path.display()
        );
    }

    if result.restored {
        warn!("Lattice minimization failed; the original configuration was restored.");
        println!("Warning: the minimization failed and the input cell was kept.");
    }

    Ok(())
}

fn print_summary(result: &RelaxResult) {
    println!();
    println!("Stop reason:       {}", result.outcome.stop_reason);
    println!("Iterations:        {}", result.outcome.iterations);
    println!("Basis dimension:   {}", result.basis_dimension);
    println!("Initial energy:    {:.10}", result.initial_energy);
    println!("Final energy:      {:.10}", result.final_energy);
    println!(
        "  pair / coulomb / electronic: {:.10} / {:.10} / {:.10}",
        result.energies.pair, result.energies.coulomb, result.energies.electronic
    );
    println!("Strain:");
    for row in format_rows(&result.strain) {
        println!("  {}", row);
    }
    println!("Lattice vectors (columns):");
    for row in format_rows(&result.structure.lattice) {
        println!("  {}", row);
    }
    println!("Volume:            {:.10}", result.structure.lattice.determinant());
    println!();
}

fn write_trajectory(trajectory: &LatticeTrajectory, path: &Path) -> Result<()> {
    info!("Writing {} trajectory frames to {:?}", trajectory.len(), path);
    let content = toml::to_string(trajectory).map_err(|e| CliError::FileWriting {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    std::fs::write(path, content)?;
    Ok(())
}
