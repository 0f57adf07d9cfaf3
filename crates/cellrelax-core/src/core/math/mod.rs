//! Small dense linear-algebra helpers over `nalgebra::Matrix3`: the Frobenius
//! inner product used throughout the strain space, and exact integer
//! determinant/adjugate arithmetic for symmetry operations.

pub mod tensor;
