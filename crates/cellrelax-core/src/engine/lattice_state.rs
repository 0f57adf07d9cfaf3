use crate::core::math::tensor::frobenius_norm;
use nalgebra::Matrix3;

/// The strained cell `R = R0 + R0 · ε`.
///
/// `R0` is captured once and never mutated; only [`LatticeState::step`] and
/// [`LatticeState::reset`] change the strain.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeState {
    original: Matrix3<f64>,
    strain: Matrix3<f64>,
}

impl LatticeState {
    pub fn new(original: Matrix3<f64>) -> Self {
        Self {
            original,
            strain: Matrix3::zeros(),
        }
    }

    pub fn original(&self) -> &Matrix3<f64> {
        &self.original
    }

    pub fn strain(&self) -> &Matrix3<f64> {
        &self.strain
    }

    pub fn strain_norm(&self) -> f64 {
        frobenius_norm(&self.strain)
    }

    pub fn cell(&self) -> Matrix3<f64> {
        self.cell_at(&self.strain)
    }

    /// Cell for an arbitrary strain, leaving the current one untouched.
    pub fn cell_at(&self, strain: &Matrix3<f64>) -> Matrix3<f64> {
        self.original + self.original * strain
    }

    pub fn step(&mut self, direction: &Matrix3<f64>, alpha: f64) {
        self.strain += direction * alpha;
    }

    pub fn reset(&mut self) {
        self.strain = Matrix3::zeros();
    }
}
