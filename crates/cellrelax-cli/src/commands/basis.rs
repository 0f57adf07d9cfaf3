use crate::cli::BasisArgs;
use crate::config;
use crate::error::{CliError, Result};
use cellrelax::{
    core::io::{toml_structure::TomlStructure, traits::StructureFile},
    core::math::tensor::format_rows,
    workflows,
};
use tracing::info;

pub fn run(args: BasisArgs) -> Result<()> {
    let core_config = config::build_core_config(&args.settings)?;

    info!("Loading input structure from {:?}", &args.input);
    let structure =
        TomlStructure::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;

    let report = workflows::basis::run(&structure, &core_config)?;

    println!("Symmetry operations: {}", report.group_order);
    println!("Truncated axes:      {:?}", report.truncated);
    println!("Basis dimension:     {}", report.dimension());
    for (i, vector) in report.vectors.iter().enumerate() {
        println!("Basis vector {}:", i + 1);
        for row in format_rows(vector) {
            println!("  {}", row);
        }
    }
    Ok(())
}
