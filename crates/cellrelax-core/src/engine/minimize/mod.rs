//! Domain-agnostic conjugate-gradient minimization.
//!
//! Anything implementing [`Minimizable`] over a [`VectorSpace`] can be driven by
//! [`minimize`]: the lattice strain adapter and the nested ionic relaxation both
//! run through the same driver with their own [`MinimizeParams`].

mod linmin;

use nalgebra::Matrix3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

pub use fd_test::fd_test;
use linmin::{LineOutcome, quadratic_line_minimize};

/// Minimal vector-space operations the driver needs on gradients and directions.
pub trait VectorSpace: Clone {
    /// `self += alpha * x`
    fn axpy(&mut self, alpha: f64, x: &Self);
    fn dot(&self, other: &Self) -> f64;
    fn scale(&mut self, alpha: f64);
    /// Overwrites every component with a uniform sample from `[-1, 1)`.
    fn randomize(&mut self, rng: &mut impl Rng);
}

impl VectorSpace for Matrix3<f64> {
    fn axpy(&mut self, alpha: f64, x: &Self) {
        *self += x * alpha;
    }

    fn dot(&self, other: &Self) -> f64 {
        crate::core::math::tensor::frobenius_dot(self, other)
    }

    fn scale(&mut self, alpha: f64) {
        *self *= alpha;
    }

    fn randomize(&mut self, rng: &mut impl Rng) {
        for x in self.iter_mut() {
            *x = rng.gen_range(-1.0..1.0);
        }
    }
}

/// Energy at the current point, with the gradient when it was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<V> {
    pub energy: f64,
    pub gradient: Option<V>,
}

impl<V> Evaluation<V> {
    pub fn energy_only(energy: f64) -> Self {
        Self {
            energy,
            gradient: None,
        }
    }

    pub fn with_gradient(energy: f64, gradient: V) -> Self {
        Self {
            energy,
            gradient: Some(gradient),
        }
    }
}

/// An object the driver can minimize.
///
/// The driver only ever moves the object through [`Minimizable::step`] and only
/// reads it through [`Minimizable::compute`]. A non-finite energy from `compute`
/// is a signal to back off, not an error.
pub trait Minimizable {
    type Vector: VectorSpace;
    type Error;

    /// Moves the current point by `alpha * direction`.
    fn step(&mut self, direction: &Self::Vector, alpha: f64);

    fn compute(&mut self, want_gradient: bool) -> Result<Evaluation<Self::Vector>, Self::Error>;

    /// Applies the preconditioner `K` to a gradient.
    fn precondition(&self, gradient: &Self::Vector) -> Self::Vector;

    /// Projects a direction onto the feasible subspace, in place.
    fn constrain(&self, direction: &mut Self::Vector);

    /// Called once per iteration. Returning `true` asks the driver to
    /// recompute energy and gradient because the object changed itself.
    fn report(&mut self, iteration: usize) -> Result<bool, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectionUpdate {
    SteepestDescent,
    #[default]
    PolakRibiere,
    FletcherReeves,
    HestenesStiefel,
}

impl fmt::Display for DirectionUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirectionUpdate::SteepestDescent => "steepest-descent",
            DirectionUpdate::PolakRibiere => "polak-ribiere",
            DirectionUpdate::FletcherReeves => "fletcher-reeves",
            DirectionUpdate::HestenesStiefel => "hestenes-stiefel",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeParams {
    /// Iteration cap. Zero evaluates the starting point once and stops.
    pub n_iterations: usize,
    /// Stop when `dot(g, K g)` falls below this.
    pub knorm_threshold: f64,
    pub energy_diff_threshold: f64,
    /// Consecutive iterations with `|ΔE| < energy_diff_threshold` needed to stop.
    pub n_energy_diff: usize,
    pub dir_update: DirectionUpdate,
    pub alpha_t_start: f64,
    pub alpha_t_min: f64,
    pub alpha_t_reduce_factor: f64,
    pub alpha_t_increase_factor: f64,
    pub n_alpha_adjust_max: usize,
    pub update_test_step_size: bool,
    pub fd_test: bool,
    /// Prefix for log lines, e.g. `"LatticeMinimize"`.
    pub label: String,
}

impl Default for MinimizeParams {
    fn default() -> Self {
        Self {
            n_iterations: 100,
            knorm_threshold: 1e-8,
            energy_diff_threshold: 1e-8,
            n_energy_diff: 2,
            dir_update: DirectionUpdate::default(),
            alpha_t_start: 1.0,
            alpha_t_min: 1e-10,
            alpha_t_reduce_factor: 0.1,
            alpha_t_increase_factor: 3.0,
            n_alpha_adjust_max: 3,
            update_test_step_size: true,
            fd_test: false,
            label: "Minimize".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    GradientConverged,
    EnergyConverged,
    IterationLimit,
    LineMinimizationFailed,
    NonFiniteEnergy,
    MissingGradient,
}

impl StopReason {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            StopReason::GradientConverged | StopReason::EnergyConverged
        )
    }

    /// Whether the object may have been left at an unusable point.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StopReason::LineMinimizationFailed
                | StopReason::NonFiniteEnergy
                | StopReason::MissingGradient
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::GradientConverged => "converged (|grad|_K below threshold)",
            StopReason::EnergyConverged => "converged (energy change below threshold)",
            StopReason::IterationLimit => "iteration limit reached",
            StopReason::LineMinimizationFailed => "line minimization failed twice in a row",
            StopReason::NonFiniteEnergy => "non-finite energy at the starting point",
            StopReason::MissingGradient => "gradient was requested but not returned",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeOutcome {
    pub energy: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

fn preconditioned<M: Minimizable>(obj: &M, gradient: &M::Vector) -> M::Vector {
    let mut kg = obj.precondition(gradient);
    obj.constrain(&mut kg);
    kg
}

/// Minimizes `obj` with preconditioned nonlinear conjugate gradients.
///
/// Errors returned by the object are propagated unmodified.
pub fn minimize<M: Minimizable>(
    obj: &mut M,
    params: &MinimizeParams,
) -> Result<MinimizeOutcome, M::Error> {
    let label = params.label.as_str();
    if params.fd_test {
        fd_test(obj, &mut rand::thread_rng(), label)?;
    }

    let start = obj.compute(true)?;
    let mut energy = start.energy;
    if !energy.is_finite() {
        warn!("{label}: energy at the starting point is not finite.");
        return Ok(MinimizeOutcome {
            energy,
            iterations: 0,
            stop_reason: StopReason::NonFiniteEnergy,
        });
    }
    let Some(mut g) = start.gradient else {
        return Ok(MinimizeOutcome {
            energy,
            iterations: 0,
            stop_reason: StopReason::MissingGradient,
        });
    };

    let mut kg = preconditioned(obj, &g);
    let mut direction: Option<M::Vector> = None;
    let mut g_prev: Option<M::Vector> = None;
    let mut gkg_prev = 0.0;
    let mut alpha_t = params.alpha_t_start;
    let mut small_diff_count = 0;
    let mut force_reset = false;
    let mut last_failed = false;

    let mut iter = 0;
    loop {
        if obj.report(iter)? {
            let refreshed = obj.compute(true)?;
            energy = refreshed.energy;
            match refreshed.gradient {
                Some(gradient) => g = gradient,
                None => {
                    return Ok(MinimizeOutcome {
                        energy,
                        iterations: iter,
                        stop_reason: StopReason::MissingGradient,
                    });
                }
            }
            kg = preconditioned(obj, &g);
            force_reset = true;
        }

        let gkg = g.dot(&kg);
        debug!(
            "{label}: Iter: {iter:>3}  Energy: {energy:>+.15}  |grad|_K: {:.3e}  alpha: {alpha_t:.3e}",
            gkg.abs().sqrt()
        );

        if gkg < params.knorm_threshold {
            return finish(label, energy, iter, StopReason::GradientConverged);
        }
        if params.n_energy_diff > 0 && small_diff_count >= params.n_energy_diff {
            return finish(label, energy, iter, StopReason::EnergyConverged);
        }
        if iter >= params.n_iterations {
            return finish(label, energy, iter, StopReason::IterationLimit);
        }

        let beta = match (&direction, &g_prev) {
            (Some(d), Some(gp)) if !force_reset && gkg_prev > 0.0 => {
                let beta = match params.dir_update {
                    DirectionUpdate::SteepestDescent => 0.0,
                    DirectionUpdate::FletcherReeves => gkg / gkg_prev,
                    DirectionUpdate::PolakRibiere => (gkg - gp.dot(&kg)) / gkg_prev,
                    DirectionUpdate::HestenesStiefel => {
                        let denominator = g.dot(d) - gp.dot(d);
                        if denominator == 0.0 {
                            0.0
                        } else {
                            (gkg - gp.dot(&kg)) / denominator
                        }
                    }
                };
                beta.max(0.0)
            }
            _ => 0.0,
        };

        let mut d = match direction.take() {
            Some(mut d) if beta > 0.0 => {
                d.scale(beta);
                d.axpy(-1.0, &kg);
                d
            }
            _ => {
                let mut d = kg.clone();
                d.scale(-1.0);
                d
            }
        };
        if g.dot(&d) >= 0.0 {
            debug!("{label}: Search direction is not a descent direction; resetting.");
            d = kg.clone();
            d.scale(-1.0);
        }
        if g.dot(&d) >= 0.0 {
            // No descent direction left: every further step has zero energy change.
            let stop_reason = if energy_criterion_enabled(params) {
                StopReason::EnergyConverged
            } else {
                StopReason::GradientConverged
            };
            return finish(label, energy, iter, stop_reason);
        }
        force_reset = false;

        match quadratic_line_minimize(obj, &d, energy, &g, alpha_t, params)? {
            LineOutcome::Accepted {
                alpha,
                energy: new_energy,
                gradient,
            } => {
                if params.update_test_step_size {
                    alpha_t = alpha.max(params.alpha_t_min);
                }
                let diff = energy - new_energy;
                if diff.abs() < params.energy_diff_threshold {
                    small_diff_count += 1;
                } else {
                    small_diff_count = 0;
                }
                energy = new_energy;
                g_prev = Some(std::mem::replace(&mut g, gradient));
                gkg_prev = gkg;
                kg = preconditioned(obj, &g);
                direction = Some(d);
                last_failed = false;
            }
            LineOutcome::Failed => {
                // The object is back at the line start, so this iteration changed nothing.
                if small_diff_count > 0 {
                    small_diff_count += 1;
                    if energy_criterion_enabled(params)
                        && small_diff_count >= params.n_energy_diff
                    {
                        return finish(label, energy, iter + 1, StopReason::EnergyConverged);
                    }
                }
                if last_failed {
                    warn!("{label}: Line minimization failed twice; stopping.");
                    return finish(label, energy, iter, StopReason::LineMinimizationFailed);
                }
                warn!("{label}: Line minimization failed; resetting search direction.");
                last_failed = true;
                force_reset = true;
                alpha_t = params.alpha_t_start;
                direction = None;
            }
        }
        iter += 1;
    }
}

fn energy_criterion_enabled(params: &MinimizeParams) -> bool {
    params.n_energy_diff > 0 && params.energy_diff_threshold > 0.0
}

fn finish<E>(
    label: &str,
    energy: f64,
    iterations: usize,
    stop_reason: StopReason,
) -> Result<MinimizeOutcome, E> {
    debug!("{label}: {stop_reason} after {iterations} iterations, energy {energy:.15}");
    Ok(MinimizeOutcome {
        energy,
        iterations,
        stop_reason,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::convert::Infallible;

    /// `E(x) = sum_i w_i (x_i - c_i)^2` over a `Matrix3`, optionally refusing
    /// points farther than `limit` from the origin.
    pub(crate) struct Bowl {
        pub x: Matrix3<f64>,
        pub weights: Matrix3<f64>,
        pub center: Matrix3<f64>,
        pub limit: Option<f64>,
        pub computes: usize,
        pub reports: usize,
    }

    impl Bowl {
        pub(crate) fn new(center: Matrix3<f64>) -> Self {
            Self {
                x: Matrix3::zeros(),
                weights: Matrix3::from_fn(|i, j| 1.0 + (i + 2 * j) as f64),
                center,
                limit: None,
                computes: 0,
                reports: 0,
            }
        }
    }

    impl Minimizable for Bowl {
        type Vector = Matrix3<f64>;
        type Error = Infallible;

        fn step(&mut self, direction: &Matrix3<f64>, alpha: f64) {
            self.x += direction * alpha;
        }

        fn compute(&mut self, want_gradient: bool) -> Result<Evaluation<Matrix3<f64>>, Infallible> {
            self.computes += 1;
            if let Some(limit) = self.limit {
                if self.x.norm() > limit {
                    return Ok(Evaluation::energy_only(f64::NAN));
                }
            }
            let delta = self.x - self.center;
            let energy = self.weights.component_mul(&delta).dot(&delta);
            let gradient = want_gradient.then(|| self.weights.component_mul(&delta) * 2.0);
            Ok(Evaluation { energy, gradient })
        }

        fn precondition(&self, gradient: &Matrix3<f64>) -> Matrix3<f64> {
            *gradient
        }

        fn constrain(&self, _direction: &mut Matrix3<f64>) {}

        fn report(&mut self, _iteration: usize) -> Result<bool, Infallible> {
            self.reports += 1;
            Ok(false)
        }
    }

    fn center() -> Matrix3<f64> {
        Matrix3::new(0.3, -0.2, 0.1, 0.0, 0.5, -0.4, 0.2, 0.1, -0.1)
    }

    #[test]
    fn matrix_vector_space_operations_follow_frobenius_algebra() {
        let mut a = Matrix3::identity();
        VectorSpace::axpy(&mut a, 2.0, &Matrix3::repeat(1.0));
        assert_eq!(a[(0, 0)], 3.0);
        assert_eq!(a[(0, 1)], 2.0);
        assert_eq!(VectorSpace::dot(&Matrix3::identity(), &Matrix3::repeat(2.0)), 6.0);
        VectorSpace::scale(&mut a, 0.5);
        assert_eq!(a[(1, 1)], 1.5);

        let mut r = Matrix3::zeros();
        VectorSpace::randomize(&mut r, &mut rand::thread_rng());
        assert!(r.iter().all(|x| (-1.0..1.0).contains(x)));
    }

    #[test]
    fn converges_on_quadratic_bowl_for_every_direction_scheme() {
        for dir_update in [
            DirectionUpdate::SteepestDescent,
            DirectionUpdate::PolakRibiere,
            DirectionUpdate::FletcherReeves,
            DirectionUpdate::HestenesStiefel,
        ] {
            let mut bowl = Bowl::new(center());
            let params = MinimizeParams {
                n_iterations: 500,
                knorm_threshold: 1e-20,
                energy_diff_threshold: 0.0,
                dir_update,
                ..MinimizeParams::default()
            };
            let outcome = minimize(&mut bowl, &params).unwrap();
            assert!(outcome.stop_reason.is_converged(), "{dir_update}: {outcome:?}");
            assert!((bowl.x - center()).norm() < 1e-8, "{dir_update}");
            assert!(outcome.energy < 1e-16);
        }
    }

    #[test]
    fn conjugate_directions_beat_steepest_descent() {
        let run = |dir_update| {
            let mut bowl = Bowl::new(center());
            let params = MinimizeParams {
                n_iterations: 500,
                knorm_threshold: 1e-20,
                energy_diff_threshold: 0.0,
                dir_update,
                ..MinimizeParams::default()
            };
            minimize(&mut bowl, &params).unwrap().iterations
        };
        assert!(run(DirectionUpdate::PolakRibiere) < run(DirectionUpdate::SteepestDescent));
    }

    #[test]
    fn non_finite_test_energy_shrinks_the_step() {
        let mut bowl = Bowl::new(center());
        bowl.limit = Some(3.0);
        let params = MinimizeParams {
            alpha_t_start: 100.0,
            n_iterations: 200,
            knorm_threshold: 1e-20,
            energy_diff_threshold: 0.0,
            ..MinimizeParams::default()
        };
        let outcome = minimize(&mut bowl, &params).unwrap();
        assert!(outcome.stop_reason.is_converged(), "{outcome:?}");
        assert!((bowl.x - center()).norm() < 1e-8);
    }

    #[test]
    fn zero_iterations_only_evaluates_the_start() {
        let mut bowl = Bowl::new(center());
        let params = MinimizeParams {
            n_iterations: 0,
            ..MinimizeParams::default()
        };
        let outcome = minimize(&mut bowl, &params).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::IterationLimit);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(bowl.computes, 1);
        assert_eq!(bowl.reports, 1);
        assert_eq!(bowl.x, Matrix3::zeros());
    }

    #[test]
    fn energy_difference_criterion_stops_early() {
        let mut bowl = Bowl::new(center());
        let params = MinimizeParams {
            n_iterations: 500,
            knorm_threshold: 0.0,
            energy_diff_threshold: 1e-6,
            n_energy_diff: 2,
            ..MinimizeParams::default()
        };
        let outcome = minimize(&mut bowl, &params).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::EnergyConverged);
        assert!(outcome.energy < 1e-5);
    }

    #[test]
    fn starting_at_the_minimum_is_converged() {
        let mut bowl = Bowl::new(center());
        bowl.x = center();
        let params = MinimizeParams {
            knorm_threshold: 0.0,
            energy_diff_threshold: 0.0,
            ..MinimizeParams::default()
        };
        let outcome = minimize(&mut bowl, &params).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::GradientConverged);
        assert!(!outcome.stop_reason.is_failure());
        assert_eq!(bowl.x, center());
    }

    #[test]
    fn reaching_the_exact_minimum_with_energy_criterion_is_converged() {
        for n_energy_diff in [1, 2, 3] {
            let mut bowl = Bowl::new(center());
            bowl.x = center();
            let params = MinimizeParams {
                knorm_threshold: 0.0,
                energy_diff_threshold: 1e-6,
                n_energy_diff,
                ..MinimizeParams::default()
            };
            let outcome = minimize(&mut bowl, &params).unwrap();
            assert_eq!(outcome.stop_reason, StopReason::EnergyConverged, "n = {n_energy_diff}");
            assert_eq!(outcome.energy, 0.0);
        }
    }

    #[test]
    fn non_finite_start_is_reported() {
        let mut bowl = Bowl::new(center());
        bowl.x = Matrix3::repeat(10.0);
        bowl.limit = Some(1.0);
        let outcome = minimize(&mut bowl, &MinimizeParams::default()).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::NonFiniteEnergy);
        assert!(outcome.stop_reason.is_failure());
    }
}
