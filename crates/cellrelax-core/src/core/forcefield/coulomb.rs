use super::potentials::{self, PairValue};
use crate::core::lattice::geometry::GeometryContext;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Cell-independent electrostatics settings.
///
/// Truncated axes are treated as non-periodic: they carry no lattice images
/// and fractional separations along them are never wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CoulombParams {
    #[serde(default)]
    pub truncated: [bool; 3],
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
    #[serde(default = "default_dielectric")]
    pub dielectric: f64,
}

fn default_cutoff() -> f64 {
    10.0
}

fn default_dielectric() -> f64 {
    1.0
}

impl Default for CoulombParams {
    fn default() -> Self {
        Self {
            truncated: [false; 3],
            cutoff: default_cutoff(),
            dielectric: default_dielectric(),
        }
    }
}

impl CoulombParams {
    pub fn truncated_axes(&self) -> [bool; 3] {
        self.truncated
    }

    /// Builds the operator for the current cell shape.
    ///
    /// Along a periodic axis `k` the image range is `|n| <= rc·|row k of R⁻¹| + 1/2`,
    /// which covers every image within the cutoff once separations are wrapped
    /// into `[-1/2, 1/2]`.
    pub fn create(&self, geometry: &GeometryContext) -> CoulombOperator {
        let inv_r = geometry.inv_r();
        let extent: [i64; 3] = [0, 1, 2].map(|k| {
            if self.truncated[k] {
                0
            } else {
                (self.cutoff * inv_r.row(k).norm() + 0.5).floor() as i64
            }
        });

        let mut images = Vec::new();
        for n0 in -extent[0]..=extent[0] {
            for n1 in -extent[1]..=extent[1] {
                for n2 in -extent[2]..=extent[2] {
                    images.push(Vector3::new(n0 as f64, n1 as f64, n2 as f64));
                }
            }
        }
        trace!(
            images = images.len(),
            ?extent,
            "Coulomb operator rebuilt for new cell."
        );

        CoulombOperator {
            images,
            cutoff: self.cutoff,
            dielectric: self.dielectric,
            truncated: self.truncated,
        }
    }
}

/// Real-space electrostatics for one cell shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CoulombOperator {
    images: Vec<Vector3<f64>>,
    cutoff: f64,
    dielectric: f64,
    truncated: [bool; 3],
}

impl CoulombOperator {
    /// Lattice translations in fractional coordinates, the zero image included.
    pub fn images(&self) -> &[Vector3<f64>] {
        &self.images
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn truncated(&self) -> [bool; 3] {
        self.truncated
    }

    /// Maps a fractional separation to its nearest periodic equivalent.
    #[inline]
    pub fn wrap(&self, mut delta: Vector3<f64>) -> Vector3<f64> {
        for k in 0..3 {
            if !self.truncated[k] {
                delta[k] -= delta[k].round();
            }
        }
        delta
    }

    /// Shifted-force Coulomb interaction of a pair with the given charge product.
    #[inline]
    pub fn pair(&self, dist: f64, charge_product: f64) -> PairValue {
        if charge_product == 0.0 {
            return PairValue::ZERO;
        }
        potentials::shifted_force(dist, self.cutoff, |d| {
            potentials::coulomb(d, charge_product, 1.0, self.dielectric)
        })
    }
}
