pub const COULOMB_CONSTANT: f64 = 14.399645; // In eV·Å/e²

/// Energy and radial derivative `dE/dr` of a pair term at one distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairValue {
    pub energy: f64,
    pub derivative: f64,
}

impl PairValue {
    pub const ZERO: Self = Self {
        energy: 0.0,
        derivative: 0.0,
    };
}

#[inline]
pub fn lennard_jones_12_6(dist: f64, r_min: f64, well_depth: f64) -> PairValue {
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    PairValue {
        energy: well_depth * (rho12 - 2.0 * rho6),
        derivative: 12.0 * well_depth * (rho6 - rho12) / dist,
    }
}

#[inline]
pub fn buckingham_exp_6(dist: f64, r_min: f64, well_depth: f64, gamma: f64) -> PairValue {
    let rho = dist / r_min;
    let repulsion = (gamma * (1.0 - rho)).exp();
    let rho6_inv = rho.powi(-6);
    let factor = well_depth / (gamma - 6.0);
    PairValue {
        energy: factor * (6.0 * repulsion - gamma * rho6_inv),
        derivative: factor * 6.0 * gamma * (rho6_inv / rho - repulsion) / r_min,
    }
}

#[inline]
pub fn coulomb(dist: f64, q1: f64, q2: f64, dielectric: f64) -> PairValue {
    let energy = COULOMB_CONSTANT * q1 * q2 / (dielectric * dist);
    PairValue {
        energy,
        derivative: -energy / dist,
    }
}

/// Truncates a pair term at `cutoff` so that both energy and force vanish there.
///
/// `E_sf(r) = E(r) - E(rc) - (r - rc) E'(rc)` for `r < rc`, zero beyond.
#[inline]
pub fn shifted_force<F>(dist: f64, cutoff: f64, potential_fn: F) -> PairValue
where
    F: Fn(f64) -> PairValue,
{
    if dist >= cutoff {
        return PairValue::ZERO;
    }
    let at_r = potential_fn(dist);
    let at_cutoff = potential_fn(cutoff);
    PairValue {
        energy: at_r.energy - at_cutoff.energy - (dist - cutoff) * at_cutoff.derivative,
        derivative: at_r.derivative - at_cutoff.derivative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn numerical_derivative<F: Fn(f64) -> PairValue>(f: F, r: f64) -> f64 {
        let h = 1e-6;
        (f(r + h).energy - f(r - h).energy) / (2.0 * h)
    }

    #[test]
    fn lennard_jones_at_minimum_distance_returns_negative_well_depth() {
        let value = lennard_jones_12_6(2.0, 2.0, 10.0);
        assert!(f64_approx_equal(value.energy, -10.0));
        assert!(f64_approx_equal(value.derivative, 0.0));
    }

    #[test]
    fn lennard_jones_derivative_matches_finite_difference() {
        let f = |r| lennard_jones_12_6(r, 2.0, 0.5);
        for r in [1.7, 2.3, 3.1] {
            assert!((f(r).derivative - numerical_derivative(f, r)).abs() < 1e-6);
        }
    }

    #[test]
    fn buckingham_at_minimum_distance_returns_negative_well_depth() {
        let value = buckingham_exp_6(2.0, 2.0, 10.0, 12.0);
        assert!(f64_approx_equal(value.energy, -10.0));
        assert!(value.derivative.abs() < 1e-9);
    }

    #[test]
    fn buckingham_derivative_matches_finite_difference() {
        let f = |r| buckingham_exp_6(r, 3.0, 0.2, 12.0);
        for r in [2.5, 3.4, 4.8] {
            assert!((f(r).derivative - numerical_derivative(f, r)).abs() < 1e-6);
        }
    }

    #[test]
    fn coulomb_calculates_repulsive_interaction_correctly() {
        let value = coulomb(1.0, 1.0, 1.0, 1.0);
        assert!(f64_approx_equal(value.energy, COULOMB_CONSTANT));
        assert!(f64_approx_equal(value.derivative, -COULOMB_CONSTANT));
    }

    #[test]
    fn coulomb_calculates_attractive_interaction_correctly() {
        let value = coulomb(2.0, 1.0, -1.0, 2.0);
        assert!(f64_approx_equal(value.energy, -COULOMB_CONSTANT / 4.0));
    }

    #[test]
    fn shifted_force_vanishes_smoothly_at_cutoff() {
        let f = |r| lennard_jones_12_6(r, 1.0, 1.0);
        let just_inside = shifted_force(2.5 - 1e-9, 2.5, f);
        assert!(just_inside.energy.abs() < 1e-9);
        assert!(just_inside.derivative.abs() < 1e-8);
        assert_eq!(shifted_force(2.6, 2.5, f), PairValue::ZERO);
    }

    #[test]
    fn shifted_force_preserves_derivative_consistency() {
        let f = |r| shifted_force(r, 6.0, |d| coulomb(d, 1.0, -2.0, 1.0));
        for r in [1.5, 3.0, 5.5] {
            assert!((f(r).derivative - numerical_derivative(f, r)).abs() < 1e-6);
        }
    }
}
