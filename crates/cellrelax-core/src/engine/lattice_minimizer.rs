use super::config::LatticeMinimizeConfig;
use super::dump::{DumpFrequency, DumpHook, LatticeSnapshot};
use super::error::EngineError;
use super::ionic_minimizer::IonicRelaxer;
use super::lattice_state::LatticeState;
use super::minimize::{Evaluation, Minimizable};
use super::state::{SimulationState, UpdateMode};
use super::strain_basis::{AxisConstraints, StrainBasis};
use super::stress::evaluate_stress;
use crate::core::lattice::symmetry::SymmetryProvider;
use crate::core::math::tensor::{self, format_rows};
use nalgebra::{Matrix3, Vector3};
use tracing::{info, warn};

/// Minimizes the free energy over symmetric strains of the simulation cell,
/// relaxing the ions at every trial cell.
///
/// The strain is the minimization variable; `R0` is captured from the state at
/// construction and the cell is always `R0 + R0 · ε`. Only
/// [`LatticeMinimizer::restore`] brings the strain back to zero.
pub struct LatticeMinimizer<'h> {
    state: SimulationState,
    relaxer: Box<dyn IonicRelaxer + 'h>,
    lattice: LatticeState,
    basis: StrainBasis,
    config: LatticeMinimizeConfig,
    hooks: Vec<&'h mut dyn DumpHook>,
    initial_positions: Vec<Vector3<f64>>,
}

impl<'h> LatticeMinimizer<'h> {
    /// Builds the strain basis from `symmetries`, the move scales in `config`
    /// and the truncated Coulomb axes of `state`.
    ///
    /// Configuration problems with the basis are reported here, before any
    /// energy is evaluated.
    pub fn new(
        state: SimulationState,
        relaxer: Box<dyn IonicRelaxer + 'h>,
        config: LatticeMinimizeConfig,
        symmetries: &dyn SymmetryProvider,
    ) -> Result<Self, EngineError> {
        let constraints =
            AxisConstraints::new(config.move_scale, state.coulomb_params().truncated_axes());
        let basis = StrainBasis::build(symmetries, &constraints)?;
        let lattice = LatticeState::new(*state.geometry().r());
        let initial_positions = state.ions().positions().to_vec();
        Ok(Self {
            state,
            relaxer,
            lattice,
            basis,
            config,
            hooks: Vec::new(),
            initial_positions,
        })
    }

    pub fn add_hook(&mut self, hook: &'h mut dyn DumpHook) {
        self.hooks.push(hook);
    }

    pub fn strain(&self) -> &Matrix3<f64> {
        self.lattice.strain()
    }

    pub fn cell(&self) -> Matrix3<f64> {
        self.lattice.cell()
    }

    pub fn basis(&self) -> &StrainBasis {
        &self.basis
    }

    pub fn config(&self) -> &LatticeMinimizeConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn into_state(self) -> SimulationState {
        self.state
    }

    /// Stress along every basis vector at the current strain.
    ///
    /// Relaxes the ions at the current cell and then runs four probe
    /// evaluations per basis vector, so this is roughly `4 · dim + 1` nested
    /// relaxations.
    pub fn stress(&mut self) -> Result<Vec<f64>, EngineError> {
        let cell = self.lattice.cell();
        self.state.propagate(&cell, UpdateMode::Full)?;
        self.relaxer.relax(&mut self.state)?;
        self.probe_stress(&cell)
    }

    /// Back to zero strain, the original cell and the original ionic positions.
    pub fn restore(&mut self) -> Result<(), EngineError> {
        self.lattice.reset();
        self.state
            .ions_mut()
            .set_positions(&self.initial_positions);
        self.state
            .propagate(self.lattice.original(), UpdateMode::Full)
    }

    /// Fires every hook once with [`DumpFrequency::End`].
    pub fn dump_end(&mut self, iteration: usize) -> Result<(), EngineError> {
        self.dump(DumpFrequency::End, iteration)
    }

    fn label(&self) -> &str {
        &self.config.minimize.label
    }

    fn probe_stress(&mut self, cell: &Matrix3<f64>) -> Result<Vec<f64>, EngineError> {
        let stress = evaluate_stress(
            &mut self.state,
            self.relaxer.as_mut(),
            &self.lattice,
            &self.basis,
            self.config.fd_step,
            self.config.probe_relaxation,
        )?;
        self.state.propagate(cell, UpdateMode::Full)?;
        Ok(stress)
    }

    fn dump(&mut self, frequency: DumpFrequency, iteration: usize) -> Result<(), EngineError> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        let snapshot = LatticeSnapshot::new(
            iteration,
            self.state.free_energy(),
            self.lattice.strain(),
            self.state.geometry().r(),
            self.state.ions().positions(),
        );
        for hook in &mut self.hooks {
            hook.dump(frequency, iteration, &snapshot)?;
        }
        Ok(())
    }
}

impl Minimizable for LatticeMinimizer<'_> {
    type Vector = Matrix3<f64>;
    type Error = EngineError;

    fn step(&mut self, direction: &Matrix3<f64>, alpha: f64) {
        self.lattice.step(direction, alpha);
    }

    fn compute(&mut self, want_gradient: bool) -> Result<Evaluation<Matrix3<f64>>, EngineError> {
        let strain_norm = self.lattice.strain_norm();
        if strain_norm > self.config.max_allowed_strain {
            let label = self.label();
            warn!(
                "{label}: Strain tensor norm {strain_norm:.6e} exceeds the maximum allowed {:.6e}; \
                 the cell is likely unstable.",
                self.config.max_allowed_strain
            );
            for row in format_rows(self.lattice.strain()) {
                warn!("{label}:   strain {row}");
            }
            for row in format_rows(self.state.geometry().r()) {
                warn!("{label}:   lattice {row}");
            }
            return Ok(Evaluation::energy_only(f64::NAN));
        }

        let cell = self.lattice.cell();
        self.state.propagate(&cell, UpdateMode::Full)?;
        self.relaxer.relax(&mut self.state)?;
        let energy = self.state.free_energy();
        if !want_gradient {
            return Ok(Evaluation::energy_only(energy));
        }

        let stress = self.probe_stress(&cell)?;
        Ok(Evaluation::with_gradient(energy, self.basis.combine(&stress)))
    }

    /// `D · g · D` with `D = diag(move_scale)`.
    fn precondition(&self, gradient: &Matrix3<f64>) -> Matrix3<f64> {
        let d = tensor::diagonal(&self.config.move_scale);
        d * gradient * d
    }

    fn constrain(&self, direction: &mut Matrix3<f64>) {
        *direction = self.basis.project(direction);
    }

    fn report(&mut self, iteration: usize) -> Result<bool, EngineError> {
        // A failed line search steps back without recomputing; bring the
        // dependent state back to the current strain before reporting it.
        let cell = self.lattice.cell();
        if self.state.geometry().r() != &cell {
            self.state.propagate(&cell, UpdateMode::Full)?;
            self.relaxer.relax(&mut self.state)?;
        }

        let label = self.label();
        info!(
            "{label}: Iteration {iteration}, free energy {:.15}",
            self.state.free_energy()
        );
        self.state.geometry().print_lattice();
        self.state.geometry().print_reciprocal_lattice();
        info!("{label}: Strain tensor:");
        for row in format_rows(self.lattice.strain()) {
            info!("{label}:   {row}");
        }
        self.dump(DumpFrequency::Lattice, iteration)?;
        Ok(false)
    }
}
