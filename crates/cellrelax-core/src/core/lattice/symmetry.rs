use crate::core::math::tensor::{IntMatrix3, int_determinant};
use itertools::iproduct;

/// Point-group operation in lattice coordinates (`x' = m · x`).
pub type SymmetryMatrix = IntMatrix3;

/// Source of the point-group operations that map the cell onto itself.
pub trait SymmetryProvider {
    fn matrices(&self) -> &[SymmetryMatrix];
}

/// An ordered list of symmetry operations.
///
/// An empty list is treated as the trivial group, so the identity is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryGroup {
    matrices: Vec<SymmetryMatrix>,
}

impl SymmetryGroup {
    pub fn new(matrices: Vec<SymmetryMatrix>) -> Self {
        if matrices.is_empty() {
            return Self::identity();
        }
        Self { matrices }
    }

    pub fn identity() -> Self {
        Self {
            matrices: vec![SymmetryMatrix::identity()],
        }
    }

    /// Closes a set of generators under multiplication.
    ///
    /// Generators that are not unimodular are dropped, since they cannot
    /// belong to a finite group of lattice operations.
    pub fn from_generators(generators: &[SymmetryMatrix]) -> Self {
        let generators: Vec<_> = generators
            .iter()
            .filter(|m| int_determinant(m).abs() == 1)
            .copied()
            .collect();
        let mut matrices = vec![SymmetryMatrix::identity()];
        let mut frontier = matrices.clone();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for (element, generator) in iproduct!(&frontier, &generators) {
                let product = generator * element;
                if !matrices.contains(&product) {
                    matrices.push(product);
                    next.push(product);
                }
            }
            frontier = next;
        }
        Self { matrices }
    }

    /// The 48 signed permutation matrices (m-3m) of a cubic cell.
    pub fn cubic() -> Self {
        Self::from_generators(&[
            SymmetryMatrix::new(0, 0, 1, 1, 0, 0, 0, 1, 0),
            SymmetryMatrix::new(0, 1, 0, 1, 0, 0, 0, 0, 1),
            SymmetryMatrix::new(-1, 0, 0, 0, 1, 0, 0, 0, 1),
        ])
    }

    /// The 16 operations (4/mmm) of a tetragonal cell with its unique axis along `c`.
    pub fn tetragonal() -> Self {
        Self::from_generators(&[
            SymmetryMatrix::new(0, 1, 0, 1, 0, 0, 0, 0, 1),
            SymmetryMatrix::new(-1, 0, 0, 0, 1, 0, 0, 0, 1),
            SymmetryMatrix::new(1, 0, 0, 0, 1, 0, 0, 0, -1),
        ])
    }

    /// The 8 axis reflections (mmm) of an orthorhombic cell.
    pub fn orthorhombic() -> Self {
        Self::from_generators(&[
            SymmetryMatrix::new(-1, 0, 0, 0, 1, 0, 0, 0, 1),
            SymmetryMatrix::new(1, 0, 0, 0, -1, 0, 0, 0, 1),
            SymmetryMatrix::new(1, 0, 0, 0, 1, 0, 0, 0, -1),
        ])
    }

    /// The 24 operations (6/mmm) of a hexagonal cell with `a1`, `a2` at 120°.
    pub fn hexagonal() -> Self {
        Self::from_generators(&[
            SymmetryMatrix::new(1, -1, 0, 1, 0, 0, 0, 0, 1),
            SymmetryMatrix::new(0, 1, 0, 1, 0, 0, 0, 0, 1),
            SymmetryMatrix::new(1, 0, 0, 0, 1, 0, 0, 0, -1),
        ])
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

impl SymmetryProvider for SymmetryGroup {
    fn matrices(&self) -> &[SymmetryMatrix] {
        &self.matrices
    }
}

impl Default for SymmetryGroup {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_falls_back_to_identity() {
        let group = SymmetryGroup::new(vec![]);
        assert_eq!(group.matrices(), &[SymmetryMatrix::identity()]);
    }

    #[test]
    fn standard_groups_have_expected_orders() {
        assert_eq!(SymmetryGroup::cubic().len(), 48);
        assert_eq!(SymmetryGroup::hexagonal().len(), 24);
        assert_eq!(SymmetryGroup::tetragonal().len(), 16);
        assert_eq!(SymmetryGroup::orthorhombic().len(), 8);
    }

    #[test]
    fn generated_groups_are_closed_under_multiplication() {
        let group = SymmetryGroup::hexagonal();
        for a in group.matrices() {
            for b in group.matrices() {
                assert!(group.matrices().contains(&(a * b)));
            }
        }
    }

    #[test]
    fn from_generators_drops_non_unimodular_generators() {
        let group = SymmetryGroup::from_generators(&[SymmetryMatrix::identity() * 2]);
        assert_eq!(group.len(), 1);
    }
}
