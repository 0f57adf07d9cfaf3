use crate::core::lattice::symmetry::SymmetryProvider;
use crate::core::math::tensor::{self, IntMatrix3};
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;
use tracing::info;

/// Candidates whose squared residual norm falls below this after
/// orthogonalization are linearly dependent on the accepted basis.
const DEPENDENCE_THRESHOLD_SQ: f64 = 1e-8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BasisError {
    #[error(
        "Move scale is not commensurate with symmetries: lattice vectors #{axis_a} and #{axis_b} \
         are connected by symmetry but have different move scale factors {scale_a} != {scale_b}"
    )]
    MoveScaleMismatch {
        axis_a: usize,
        axis_b: usize,
        scale_a: f64,
        scale_b: f64,
    },
    #[error(
        "Lattice vectors #{axis_a} and #{axis_b} are connected by symmetry but only one of them \
         is truncated"
    )]
    FixedStatusMismatch { axis_a: usize, axis_b: usize },
    #[error("Symmetry matrix #{index} is not unimodular (|det| != 1)")]
    NotUnimodular { index: usize },
    #[error(
        "All lattice vectors are constrained by Coulomb truncation and/or move scale: \
         disable lattice minimization"
    )]
    FullyConstrained,
}

/// Per-axis freedom of the lattice vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisConstraints {
    /// Diagonal preconditioner per lattice vector. Zero freezes the axis.
    pub move_scale: Vector3<f64>,
    /// Axes excluded from periodic treatment.
    pub truncated: [bool; 3],
}

impl AxisConstraints {
    pub fn new(move_scale: Vector3<f64>, truncated: [bool; 3]) -> Self {
        Self {
            move_scale,
            truncated,
        }
    }

    #[inline]
    pub fn is_fixed(&self, axis: usize) -> bool {
        self.move_scale[axis] == 0.0 || self.truncated[axis]
    }
}

impl Default for AxisConstraints {
    fn default() -> Self {
        Self::new(Vector3::repeat(1.0), [false; 3])
    }
}

/// Orthonormal basis of the symmetric strains compatible with the point group
/// and the axis constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct StrainBasis {
    vectors: Vec<Matrix3<f64>>,
}

/// Canonical symmetric generator `k` in `0..6`: unit diagonal strains first,
/// then the shears coupling `((k+1) % 3, (k+2) % 3)`.
fn generator(k: usize) -> (IntMatrix3, [usize; 2]) {
    let mut s = IntMatrix3::zeros();
    if k < 3 {
        s[(k, k)] = 1;
        (s, [k, k])
    } else {
        let (i, j) = ((k + 1) % 3, (k + 2) % 3);
        s[(i, j)] = 1;
        s[(j, i)] = 1;
        (s, [i, j])
    }
}

fn validate<S: SymmetryProvider + ?Sized>(
    symmetry: &S,
    constraints: &AxisConstraints,
) -> Result<Vec<(IntMatrix3, IntMatrix3)>, BasisError> {
    let mut operations = Vec::with_capacity(symmetry.matrices().len());
    for (index, m) in symmetry.matrices().iter().enumerate() {
        let m_inv = tensor::unimodular_inverse(m).ok_or(BasisError::NotUnimodular { index })?;
        for i in 0..3 {
            for j in 0..3 {
                if i == j || m[(i, j)] == 0 {
                    continue;
                }
                let (scale_a, scale_b) = (constraints.move_scale[i], constraints.move_scale[j]);
                if scale_a != scale_b {
                    return Err(BasisError::MoveScaleMismatch {
                        axis_a: i,
                        axis_b: j,
                        scale_a,
                        scale_b,
                    });
                }
                if constraints.is_fixed(i) != constraints.is_fixed(j) {
                    return Err(BasisError::FixedStatusMismatch { axis_a: i, axis_b: j });
                }
            }
        }
        operations.push((*m, m_inv));
    }
    Ok(operations)
}

impl StrainBasis {
    /// Builds the basis by symmetrizing each free canonical generator over the
    /// group and Gram-Schmidt orthonormalizing it against earlier vectors.
    ///
    /// Fails before any basis construction if symmetry-linked axes disagree on
    /// move scale or fixed status, or if a symmetry matrix is not unimodular.
    pub fn build<S: SymmetryProvider + ?Sized>(
        symmetry: &S,
        constraints: &AxisConstraints,
    ) -> Result<Self, BasisError> {
        let operations = validate(symmetry, constraints)?;

        let mut vectors: Vec<Matrix3<f64>> = Vec::with_capacity(6);
        for k in 0..6 {
            let (s, [i, j]) = generator(k);
            if constraints.is_fixed(i) || constraints.is_fixed(j) {
                continue;
            }
            let symmetrized: IntMatrix3 = if operations.is_empty() {
                s
            } else {
                operations.iter().map(|(m, m_inv)| m_inv * s * m).sum()
            };

            let mut candidate = tensor::to_real(&symmetrized);
            for previous in &vectors {
                let overlap = tensor::frobenius_dot(previous, &candidate);
                candidate -= previous * overlap;
            }
            let norm_sq = tensor::frobenius_norm_squared(&candidate);
            if norm_sq < DEPENDENCE_THRESHOLD_SQ {
                continue;
            }
            vectors.push(candidate / norm_sq.sqrt());
        }

        if vectors.is_empty() {
            return Err(BasisError::FullyConstrained);
        }
        let basis = Self { vectors };
        basis.print();
        Ok(basis)
    }

    pub fn dimension(&self) -> usize {
        self.vectors.len()
    }

    pub fn vectors(&self) -> &[Matrix3<f64>] {
        &self.vectors
    }

    /// Coordinates of `m` along each basis vector.
    pub fn coordinates(&self, m: &Matrix3<f64>) -> Vec<f64> {
        self.vectors
            .iter()
            .map(|b| tensor::frobenius_dot(b, m))
            .collect()
    }

    /// `Σ_k coefficients[k] · basis[k]`; extra coefficients are ignored.
    pub fn combine(&self, coefficients: &[f64]) -> Matrix3<f64> {
        self.vectors
            .iter()
            .zip(coefficients)
            .fold(Matrix3::zeros(), |acc, (b, &c)| acc + b * c)
    }

    /// Orthogonal projection onto the span of the basis.
    pub fn project(&self, m: &Matrix3<f64>) -> Matrix3<f64> {
        self.combine(&self.coordinates(m))
    }

    fn print(&self) {
        info!(
            "Minimization of dimension {} over strains spanned by:",
            self.dimension()
        );
        for (index, vector) in self.vectors.iter().enumerate() {
            for row in tensor::format_rows(vector) {
                info!("  s{} {}", index, row);
            }
        }
    }
}
