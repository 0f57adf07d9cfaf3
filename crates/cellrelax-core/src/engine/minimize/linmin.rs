use super::{Minimizable, MinimizeParams, VectorSpace};
use tracing::{debug, trace};

/// Relative slack allowed when checking that an accepted step lowered the energy.
const ENERGY_TOLERANCE: f64 = 1e-15;

pub(super) enum LineOutcome<V> {
    Accepted {
        alpha: f64,
        energy: f64,
        gradient: V,
    },
    /// The object has been stepped back to the start of the line.
    Failed,
}

/// Line minimization along `d` by fitting a parabola through the start point,
/// its slope and one test step.
///
/// A non-finite test energy or an energy increase shrinks the test step; a
/// parabola with non-positive curvature grows it. Each adjustment counts
/// against `n_alpha_adjust_max`.
pub(super) fn quadratic_line_minimize<M: Minimizable>(
    obj: &mut M,
    d: &M::Vector,
    energy: f64,
    g: &M::Vector,
    alpha_t_start: f64,
    params: &MinimizeParams,
) -> Result<LineOutcome<M::Vector>, M::Error> {
    let label = params.label.as_str();
    let slope = g.dot(d);
    let mut alpha_t = alpha_t_start;
    let mut alpha_current = 0.0;
    let mut adjustments = 0;

    let outcome = loop {
        if adjustments > params.n_alpha_adjust_max || alpha_t < params.alpha_t_min {
            break None;
        }

        obj.step(d, alpha_t - alpha_current);
        alpha_current = alpha_t;
        let test_energy = obj.compute(false)?.energy;
        if !test_energy.is_finite() {
            debug!("{label}: Test step {alpha_t:.3e} gave a non-finite energy; reducing.");
            alpha_t *= params.alpha_t_reduce_factor;
            adjustments += 1;
            continue;
        }

        let curvature = (test_energy - energy - slope * alpha_t) / (alpha_t * alpha_t);
        if curvature <= 0.0 {
            debug!("{label}: Wrong curvature at test step {alpha_t:.3e}; increasing.");
            alpha_t *= params.alpha_t_increase_factor;
            adjustments += 1;
            continue;
        }

        let alpha = -slope / (2.0 * curvature);
        trace!(alpha_t, alpha, curvature, "Quadratic line fit.");
        obj.step(d, alpha - alpha_current);
        alpha_current = alpha;
        let eval = obj.compute(true)?;
        let tolerance = ENERGY_TOLERANCE * energy.abs().max(1.0);
        if !eval.energy.is_finite() || eval.energy > energy + tolerance {
            debug!(
                "{label}: Step {alpha:.3e} did not lower the energy ({:+.3e}); reducing.",
                eval.energy - energy
            );
            alpha_t = alpha * params.alpha_t_reduce_factor;
            adjustments += 1;
            continue;
        }
        match eval.gradient {
            Some(gradient) => {
                break Some(LineOutcome::Accepted {
                    alpha,
                    energy: eval.energy,
                    gradient,
                });
            }
            None => break None,
        }
    };

    Ok(match outcome {
        Some(accepted) => accepted,
        None => {
            obj.step(d, -alpha_current);
            LineOutcome::Failed
        }
    })
}
