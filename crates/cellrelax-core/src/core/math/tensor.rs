use nalgebra::{Matrix3, Vector3};

/// Integer 3×3 matrix acting on lattice coordinates.
pub type IntMatrix3 = Matrix3<i32>;

/// Frobenius inner product `trace(a · bᵀ)`.
#[inline]
pub fn frobenius_dot(a: &Matrix3<f64>, b: &Matrix3<f64>) -> f64 {
    (a * b.transpose()).trace()
}

#[inline]
pub fn frobenius_norm_squared(a: &Matrix3<f64>) -> f64 {
    frobenius_dot(a, a)
}

#[inline]
pub fn frobenius_norm(a: &Matrix3<f64>) -> f64 {
    frobenius_norm_squared(a).sqrt()
}

pub fn int_determinant(m: &IntMatrix3) -> i32 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// Transposed cofactor matrix, so that `m · adj(m) = det(m) · I`.
pub fn int_adjugate(m: &IntMatrix3) -> IntMatrix3 {
    IntMatrix3::from_fn(|i, j| {
        let (r1, r2) = ((j + 1) % 3, (j + 2) % 3);
        let (c1, c2) = ((i + 1) % 3, (i + 2) % 3);
        m[(r1, c1)] * m[(r2, c2)] - m[(r1, c2)] * m[(r2, c1)]
    })
}

/// Exact inverse of a unimodular integer matrix (`|det| = 1`), `None` otherwise.
pub fn unimodular_inverse(m: &IntMatrix3) -> Option<IntMatrix3> {
    let det = int_determinant(m);
    if det.abs() != 1 {
        return None;
    }
    Some(int_adjugate(m) * det)
}

#[inline]
pub fn to_real(m: &IntMatrix3) -> Matrix3<f64> {
    m.map(|x| x as f64)
}

#[inline]
pub fn diagonal(scales: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::from_diagonal(scales)
}

pub fn is_symmetric(a: &Matrix3<f64>, tolerance: f64) -> bool {
    (a - a.transpose()).amax() <= tolerance
}

/// One formatted line per matrix row, for log output.
pub fn format_rows(m: &Matrix3<f64>) -> [String; 3] {
    [0, 1, 2].map(|i| {
        format!(
            "[ {:>14.8} {:>14.8} {:>14.8} ]",
            m[(i, 0)],
            m[(i, 1)],
            m[(i, 2)]
        )
    })
}
