use crate::core::models::structure::Structure;
use crate::engine::config::RelaxConfig;
use crate::engine::error::EngineError;
use crate::engine::strain_basis::{AxisConstraints, StrainBasis};
use nalgebra::Matrix3;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct BasisReport {
    pub group_order: usize,
    pub truncated: [bool; 3],
    pub vectors: Vec<Matrix3<f64>>,
}

impl BasisReport {
    pub fn dimension(&self) -> usize {
        self.vectors.len()
    }
}

/// Derives the strain basis a relaxation of `structure` would use, without
/// evaluating any energies.
#[instrument(skip_all, name = "basis_workflow")]
pub fn run(structure: &Structure, config: &RelaxConfig) -> Result<BasisReport, EngineError> {
    let truncated = config.coulomb.truncated_axes();
    let constraints = AxisConstraints::new(config.lattice.move_scale, truncated);
    let basis = StrainBasis::build(&structure.symmetries, &constraints)?;
    info!(
        "{} symmetry operations give a strain basis of dimension {}.",
        structure.symmetries.len(),
        basis.dimension()
    );
    Ok(BasisReport {
        group_order: structure.symmetries.len(),
        truncated,
        vectors: basis.vectors().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::symmetry::SymmetryGroup;
    use crate::engine::config::RelaxConfigBuilder;
    use crate::engine::minimize::MinimizeParams;
    use crate::engine::strain_basis::BasisError;
    use nalgebra::Vector3;

    fn config(move_scale: Vector3<f64>) -> RelaxConfig {
        RelaxConfigBuilder::new()
            .move_scale(move_scale)
            .max_allowed_strain(0.5)
            .fd_step(1e-5)
            .lattice_minimize(MinimizeParams::default())
            .ionic_minimize(MinimizeParams::default())
            .build()
            .unwrap()
    }

    fn structure(group: SymmetryGroup) -> Structure {
        Structure::new(Matrix3::identity() * 4.0, vec![], vec![]).with_symmetries(group)
    }

    #[test]
    fn hexagonal_structure_reports_two_strain_directions() {
        let report = run(
            &structure(SymmetryGroup::hexagonal()),
            &config(Vector3::new(1.0, 1.0, 1.0)),
        )
        .unwrap();
        assert_eq!(report.group_order, 24);
        assert_eq!(report.dimension(), 2);
    }

    #[test]
    fn zero_move_scale_everywhere_is_fully_constrained() {
        let err = run(&structure(SymmetryGroup::identity()), &config(Vector3::zeros())).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Basis {
                source: BasisError::FullyConstrained
            }
        ));
    }
}
