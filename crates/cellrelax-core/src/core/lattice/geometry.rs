use crate::core::math::tensor::format_rows;
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{info, trace};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Lattice vectors are degenerate or left-handed (det R = {determinant:.6e})")]
    Degenerate { determinant: f64 },
    #[error("Sample counts must be positive along every axis, got {0:?}")]
    InvalidSampleCounts([usize; 3]),
}

/// Cell-derived geometry of the simulation grid.
///
/// Lattice vectors are the columns of `R`. Everything except the sample
/// counts is a function of `R` and is recomputed by [`GeometryContext::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryContext {
    r: Matrix3<f64>,
    sample_counts: [usize; 3],
    volume: f64,
    rtr: Matrix3<f64>,
    inv_r: Matrix3<f64>,
    inv_rtr: Matrix3<f64>,
    g: Matrix3<f64>,
    ggt: Matrix3<f64>,
    sample_volume: f64,
    sample_spacing: [Vector3<f64>; 3],
    update_count: usize,
}

impl GeometryContext {
    pub fn new(r: Matrix3<f64>, sample_counts: [usize; 3]) -> Result<Self, GeometryError> {
        if sample_counts.contains(&0) {
            return Err(GeometryError::InvalidSampleCounts(sample_counts));
        }
        let mut geometry = Self {
            r,
            sample_counts,
            volume: 0.0,
            rtr: Matrix3::identity(),
            inv_r: Matrix3::identity(),
            inv_rtr: Matrix3::identity(),
            g: Matrix3::identity(),
            ggt: Matrix3::identity(),
            sample_volume: 0.0,
            sample_spacing: [Vector3::zeros(); 3],
            update_count: 0,
        };
        geometry.update(r)?;
        Ok(geometry)
    }

    /// Installs new lattice vectors and recomputes every cell-dependent quantity.
    ///
    /// On error the previous geometry is left untouched.
    pub fn update(&mut self, r: Matrix3<f64>) -> Result<(), GeometryError> {
        let determinant = r.determinant();
        if !(determinant.is_finite() && determinant > 0.0) {
            return Err(GeometryError::Degenerate { determinant });
        }
        let inv_r = r
            .try_inverse()
            .ok_or(GeometryError::Degenerate { determinant })?;
        let rtr = r.transpose() * r;

        self.r = r;
        self.volume = determinant;
        self.inv_r = inv_r;
        self.rtr = rtr;
        self.inv_rtr = inv_r * inv_r.transpose();
        self.g = inv_r * (2.0 * PI);
        self.ggt = self.g * self.g.transpose();

        let n_samples: usize = self.sample_counts.iter().product();
        self.sample_volume = determinant / n_samples as f64;
        for k in 0..3 {
            self.sample_spacing[k] = r.column(k) / self.sample_counts[k] as f64;
        }
        self.update_count += 1;

        trace!(volume = determinant, "Geometry updated for new lattice vectors.");
        Ok(())
    }

    pub fn r(&self) -> &Matrix3<f64> {
        &self.r
    }
    pub fn volume(&self) -> f64 {
        self.volume
    }
    pub fn rtr(&self) -> &Matrix3<f64> {
        &self.rtr
    }
    pub fn inv_r(&self) -> &Matrix3<f64> {
        &self.inv_r
    }
    pub fn inv_rtr(&self) -> &Matrix3<f64> {
        &self.inv_rtr
    }
    /// Reciprocal lattice vectors as rows, `G = 2π R⁻¹`.
    pub fn g(&self) -> &Matrix3<f64> {
        &self.g
    }
    pub fn ggt(&self) -> &Matrix3<f64> {
        &self.ggt
    }
    pub fn sample_counts(&self) -> [usize; 3] {
        self.sample_counts
    }
    /// Volume per grid sample.
    pub fn sample_volume(&self) -> f64 {
        self.sample_volume
    }
    /// Real-space sample vectors, one per lattice direction.
    pub fn sample_spacing(&self) -> &[Vector3<f64>; 3] {
        &self.sample_spacing
    }
    /// Number of times the lattice vectors have been (re)installed.
    pub fn update_count(&self) -> usize {
        self.update_count
    }

    #[inline]
    pub fn to_cartesian(&self, fractional: &Vector3<f64>) -> Vector3<f64> {
        self.r * fractional
    }

    #[inline]
    pub fn to_fractional(&self, cartesian: &Vector3<f64>) -> Vector3<f64> {
        self.inv_r * cartesian
    }

    pub fn print_lattice(&self) {
        info!("---------- Lattice vectors (columns) ----------");
        for row in format_rows(&self.r) {
            info!("R = {}", row);
        }
        info!("unit cell volume = {:.8}", self.volume);
    }

    pub fn print_reciprocal_lattice(&self) {
        info!("---------- Reciprocal lattice vectors (rows) ----------");
        for row in format_rows(&self.g) {
            info!("G = {}", row);
        }
    }
}
