use super::error::EngineError;
use super::minimize::{Evaluation, Minimizable, MinimizeParams, VectorSpace, minimize};
use super::state::SimulationState;
use nalgebra::Vector3;
use rand::Rng;
use tracing::debug;

/// Relaxes ionic coordinates at a fixed cell.
pub trait IonicRelaxer {
    fn relax(&mut self, state: &mut SimulationState) -> Result<(), EngineError>;
}

/// Leaves the ions where they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelaxation;

impl IonicRelaxer for NoRelaxation {
    fn relax(&mut self, _state: &mut SimulationState) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Per-atom fractional-coordinate vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct IonicGradient(pub Vec<Vector3<f64>>);

impl VectorSpace for IonicGradient {
    fn axpy(&mut self, alpha: f64, x: &Self) {
        for (a, b) in self.0.iter_mut().zip(&x.0) {
            *a += b * alpha;
        }
    }

    fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(&other.0).map(|(a, b)| a.dot(b)).sum()
    }

    fn scale(&mut self, alpha: f64) {
        for a in &mut self.0 {
            *a *= alpha;
        }
    }

    fn randomize(&mut self, rng: &mut impl Rng) {
        for a in &mut self.0 {
            for x in a.iter_mut() {
                *x = rng.gen_range(-1.0..1.0);
            }
        }
    }
}

/// Conjugate-gradient relaxation of the ions through the generic driver.
#[derive(Debug, Clone)]
pub struct IonicMinimizer {
    params: MinimizeParams,
}

impl IonicMinimizer {
    pub fn new(params: MinimizeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MinimizeParams {
        &self.params
    }
}

impl IonicRelaxer for IonicMinimizer {
    fn relax(&mut self, state: &mut SimulationState) -> Result<(), EngineError> {
        if self.params.n_iterations == 0 || state.ions().fixed().iter().all(|&fixed| fixed) {
            return Ok(());
        }
        let outcome = minimize(&mut IonicObjective { state: &mut *state }, &self.params)?;
        // The driver may have stepped back after its last evaluation.
        state.refresh_ions()?;
        debug!(
            iterations = outcome.iterations,
            ionic_energy = state.energies().ionic(),
            "Ionic relaxation finished: {}.",
            outcome.stop_reason
        );
        Ok(())
    }
}

struct IonicObjective<'a> {
    state: &'a mut SimulationState,
}

impl Minimizable for IonicObjective<'_> {
    type Vector = IonicGradient;
    type Error = EngineError;

    fn step(&mut self, direction: &IonicGradient, alpha: f64) {
        let moved: Vec<Vector3<f64>> = self
            .state
            .ions()
            .positions()
            .iter()
            .zip(&direction.0)
            .map(|(x, dx)| x + dx * alpha)
            .collect();
        self.state.ions_mut().set_positions(&moved);
    }

    fn compute(&mut self, want_gradient: bool) -> Result<Evaluation<IonicGradient>, EngineError> {
        self.state.refresh_ions()?;
        let energy = self.state.free_energy();
        Ok(if want_gradient {
            Evaluation::with_gradient(energy, IonicGradient(self.state.ions().gradient().to_vec()))
        } else {
            Evaluation::energy_only(energy)
        })
    }

    /// Maps fractional gradients through `(RᵀR)⁻¹`, which turns a Cartesian
    /// steepest-descent step into fractional coordinates.
    fn precondition(&self, gradient: &IonicGradient) -> IonicGradient {
        let metric = self.state.geometry().inv_rtr();
        IonicGradient(gradient.0.iter().map(|g| metric * g).collect())
    }

    fn constrain(&self, direction: &mut IonicGradient) {
        let fixed = self.state.ions().fixed();
        if fixed.iter().any(|&f| f) {
            for (d, &f) in direction.0.iter_mut().zip(fixed) {
                if f {
                    *d = Vector3::zeros();
                }
            }
        } else if !direction.0.is_empty() {
            let mean = direction.0.iter().sum::<Vector3<f64>>() / direction.0.len() as f64;
            for d in &mut direction.0 {
                *d -= mean;
            }
        }
    }

    fn report(&mut self, _iteration: usize) -> Result<bool, EngineError> {
        Ok(false)
    }
}
