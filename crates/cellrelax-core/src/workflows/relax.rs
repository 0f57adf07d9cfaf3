use crate::core::forcefield::term::EnergyTerm;
use crate::core::lattice::geometry::GeometryContext;
use crate::core::models::structure::Structure;
use crate::engine::config::RelaxConfig;
use crate::engine::dump::{DumpFrequency, DumpHook, LatticeSnapshot, LatticeTrajectory};
use crate::engine::error::EngineError;
use crate::engine::ionic_minimizer::IonicMinimizer;
use crate::engine::lattice_minimizer::LatticeMinimizer;
use crate::engine::minimize::{MinimizeOutcome, minimize};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::providers::PeriodicIons;
use crate::engine::state::SimulationState;
use nalgebra::Matrix3;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct RelaxResult {
    /// The input structure with the relaxed cell and ionic positions.
    pub structure: Structure,
    pub initial_energy: f64,
    pub final_energy: f64,
    pub energies: EnergyTerm,
    pub strain: Matrix3<f64>,
    pub basis_dimension: usize,
    pub outcome: MinimizeOutcome,
    /// Set when the run failed and the unstrained configuration was put back.
    pub restored: bool,
    pub trajectory: LatticeTrajectory,
}

struct ProgressHook<'r, 'a> {
    reporter: &'r ProgressReporter<'a>,
}

impl DumpHook for ProgressHook<'_, '_> {
    fn dump(
        &mut self,
        frequency: DumpFrequency,
        iteration: usize,
        snapshot: &LatticeSnapshot,
    ) -> Result<(), EngineError> {
        if frequency == DumpFrequency::Lattice {
            if iteration > 0 {
                self.reporter.report(Progress::TaskIncrement);
            }
            self.reporter.report(Progress::IterationUpdate {
                iteration,
                energy: snapshot.energy,
            });
        }
        Ok(())
    }
}

#[instrument(skip_all, name = "relax_workflow")]
pub fn run(
    structure: &Structure,
    config: &RelaxConfig,
    reporter: &ProgressReporter,
) -> Result<RelaxResult, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        "Setting up lattice minimization: {} atoms, {} species, {} symmetry operations.",
        structure.atoms.len(),
        structure.species.len(),
        structure.symmetries.len()
    );
    config.validate()?;

    let geometry = GeometryContext::new(structure.lattice, structure.sample_counts)?;
    geometry.print_lattice();
    let ions = PeriodicIons::from_structure(structure)?;
    let state = SimulationState::new(geometry, config.coulomb.clone(), Box::new(ions))?;
    let initial_energy = state.free_energy();
    info!("Initial free energy: {initial_energy:.15}");

    let relaxer = IonicMinimizer::new(config.ionic.clone());
    let mut trajectory = LatticeTrajectory::new();
    let mut progress_hook = ProgressHook { reporter };
    let mut minimizer = LatticeMinimizer::new(
        state,
        Box::new(relaxer),
        config.lattice.clone(),
        &structure.symmetries,
    )?;
    let basis_dimension = minimizer.basis().dimension();
    minimizer.add_hook(&mut trajectory);
    minimizer.add_hook(&mut progress_hook);
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Strain minimization ===
    reporter.report(Progress::PhaseStart {
        name: "Lattice minimization",
    });
    reporter.report(Progress::TaskStart {
        total_steps: config.lattice.minimize.n_iterations as u64,
    });
    let outcome = minimize(&mut minimizer, &config.lattice.minimize)?;
    reporter.report(Progress::TaskFinish);
    let restored = outcome.stop_reason.is_failure();
    if restored {
        warn!(
            "Lattice minimization failed ({}); restoring the unstrained configuration.",
            outcome.stop_reason
        );
        minimizer.restore()?;
        reporter.report(Progress::Message(format!(
            "Lattice minimization failed ({}); kept the input cell.",
            outcome.stop_reason
        )));
    } else {
        info!(
            "Lattice minimization {} after {} iterations.",
            outcome.stop_reason, outcome.iterations
        );
    }
    minimizer.dump_end(outcome.iterations)?;
    let strain = *minimizer.strain();
    let state = minimizer.into_state();
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Results ===
    let mut relaxed = structure.clone();
    relaxed.lattice = *state.geometry().r();
    relaxed.set_positions(state.ions().positions());
    let final_energy = state.free_energy();
    info!(
        "Workflow complete. Free energy {initial_energy:.15} -> {final_energy:.15}, volume {:.8}.",
        state.geometry().volume()
    );

    Ok(RelaxResult {
        structure: relaxed,
        initial_energy,
        final_energy,
        energies: *state.energies(),
        strain,
        basis_dimension,
        outcome,
        restored,
        trajectory,
    })
}
