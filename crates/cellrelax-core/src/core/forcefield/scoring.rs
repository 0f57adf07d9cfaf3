use super::coulomb::CoulombOperator;
use super::params::{PairParam, Species};
use super::potentials;
use super::term::EnergyTerm;
use crate::core::lattice::geometry::GeometryContext;
use nalgebra::Vector3;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Separations below this distance (Å) are reported as overlapping atoms.
const MIN_SEPARATION: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Species '{0}' has no force field parameters")]
    UnknownSpecies(String),
    #[error("Atom index {0} is out of range for the species table")]
    SpeciesIndexOutOfRange(usize),
    #[error("Atoms {first} and {second} overlap (distance {distance:.3e} Å)")]
    Overlap {
        first: usize,
        second: usize,
        distance: f64,
    },
    #[error("Got {positions} positions for {kinds} atoms")]
    LengthMismatch { positions: usize, kinds: usize },
}

/// Energies and fractional-coordinate gradient of a periodic ion set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIons {
    pub energy: EnergyTerm,
    pub gradient: Vec<Vector3<f64>>,
}

/// Pair-potential plus electrostatic scorer for ions in a periodic cell.
///
/// Pair terms share the image list and cutoff of the Coulomb operator and are
/// shifted-force truncated there, so energies stay continuous as the cell
/// deforms and images enter or leave the cutoff sphere.
#[derive(Debug, Clone)]
pub struct PeriodicScorer {
    species: Vec<Species>,
    pairs: Vec<PairParam>,
}

impl PeriodicScorer {
    pub fn new(species: Vec<Species>) -> Self {
        let n = species.len();
        let mut pairs = Vec::with_capacity(n * n);
        for a in &species {
            for b in &species {
                pairs.push(PairParam::mix(a, b));
            }
        }
        Self { species, pairs }
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn species_index(&self, name: &str) -> Result<usize, ScoringError> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ScoringError::UnknownSpecies(name.to_string()))
    }

    #[inline]
    fn pair(&self, a: usize, b: usize) -> &PairParam {
        &self.pairs[a * self.species.len() + b]
    }

    /// Scores every atom against all others and their periodic images.
    ///
    /// `positions` are fractional. The gradient is `∂E/∂x` with respect to
    /// those fractional coordinates.
    pub fn score(
        &self,
        kinds: &[usize],
        positions: &[Vector3<f64>],
        geometry: &GeometryContext,
        coulomb: &CoulombOperator,
    ) -> Result<ScoredIons, ScoringError> {
        if kinds.len() != positions.len() {
            return Err(ScoringError::LengthMismatch {
                positions: positions.len(),
                kinds: kinds.len(),
            });
        }
        if let Some(&bad) = kinds.iter().find(|&&k| k >= self.species.len()) {
            return Err(ScoringError::SpeciesIndexOutOfRange(bad));
        }

        let indices: Vec<usize> = (0..positions.len()).collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = indices.iter();

        #[cfg(feature = "parallel")]
        let iterator = indices.par_iter();

        let rows = iterator
            .map(|&i| self.score_row(i, kinds, positions, geometry, coulomb))
            .collect::<Result<Vec<_>, _>>()?;

        let (terms, gradient): (Vec<EnergyTerm>, Vec<_>) = rows.into_iter().unzip();
        Ok(ScoredIons {
            energy: terms.into_iter().sum(),
            gradient,
        })
    }

    fn score_row(
        &self,
        i: usize,
        kinds: &[usize],
        positions: &[Vector3<f64>],
        geometry: &GeometryContext,
        coulomb: &CoulombOperator,
    ) -> Result<(EnergyTerm, Vector3<f64>), ScoringError> {
        let r = geometry.r();
        let rt = r.transpose();
        let cutoff = coulomb.cutoff();
        let mut term = EnergyTerm::default();
        let mut grad = Vector3::zeros();

        for (j, x_j) in positions.iter().enumerate() {
            let param = self.pair(kinds[i], kinds[j]);
            let base = coulomb.wrap(x_j - positions[i]);
            for image in coulomb.images() {
                if i == j && *image == Vector3::zeros() {
                    continue;
                }
                let r_vec = r * (base + image);
                let dist = r_vec.norm();
                if dist >= cutoff {
                    continue;
                }
                if dist < MIN_SEPARATION {
                    return Err(ScoringError::Overlap {
                        first: i.min(j),
                        second: i.max(j),
                        distance: dist,
                    });
                }

                let vdw = potentials::shifted_force(dist, cutoff, |d| param.vdw(d));
                let elec = coulomb.pair(dist, param.charge_product);
                term.pair += 0.5 * vdw.energy;
                term.coulomb += 0.5 * elec.energy;

                // Self-images do not move relative to their source atom.
                if i != j {
                    let de_dr = vdw.derivative + elec.derivative;
                    grad -= rt * r_vec * (de_dr / dist);
                }
            }
        }
        Ok((term, grad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::coulomb::CoulombParams;
    use crate::core::forcefield::params::VdwParam;
    use nalgebra::Matrix3;

    fn ion(name: &str, charge: f64) -> Species {
        Species {
            name: name.to_string(),
            charge,
            vdw: VdwParam::LennardJones {
                radius: 3.0,
                well_depth: 0.05,
            },
        }
    }

    fn setup(cell: f64, cutoff: f64) -> (PeriodicScorer, GeometryContext, CoulombOperator) {
        let scorer = PeriodicScorer::new(vec![ion("Na", 1.0), ion("Cl", -1.0)]);
        let geometry = GeometryContext::new(Matrix3::identity() * cell, [1, 1, 1]).unwrap();
        let coulomb = CoulombParams {
            cutoff,
            ..CoulombParams::default()
        }
        .create(&geometry);
        (scorer, geometry, coulomb)
    }

    fn total(
        scorer: &PeriodicScorer,
        kinds: &[usize],
        x: &[Vector3<f64>],
        geometry: &GeometryContext,
        coulomb: &CoulombOperator,
    ) -> f64 {
        scorer.score(kinds, x, geometry, coulomb).unwrap().energy.total()
    }

    #[test]
    fn species_index_reports_unknown_names() {
        let (scorer, _, _) = setup(10.0, 4.0);
        assert_eq!(scorer.species_index("Cl"), Ok(1));
        assert_eq!(
            scorer.species_index("K"),
            Err(ScoringError::UnknownSpecies("K".to_string()))
        );
    }

    #[test]
    fn isolated_dimer_matches_shifted_pair_potentials() {
        let (scorer, geometry, coulomb) = setup(20.0, 6.0);
        let x = [Vector3::new(0.1, 0.1, 0.1), Vector3::new(0.25, 0.1, 0.1)];
        let scored = scorer.score(&[0, 1], &x, &geometry, &coulomb).unwrap();

        let param = PairParam::mix(&ion("Na", 1.0), &ion("Cl", -1.0));
        let vdw = potentials::shifted_force(3.0, 6.0, |d| param.vdw(d));
        let elec = coulomb.pair(3.0, -1.0);
        assert!((scored.energy.pair - vdw.energy).abs() < 1e-10);
        assert!((scored.energy.coulomb - elec.energy).abs() < 1e-10);
        assert!((scored.gradient[0] + scored.gradient[1]).norm() < 1e-10);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (scorer, geometry, coulomb) = setup(6.0, 5.0);
        let kinds = [0, 1, 1];
        let x = vec![
            Vector3::new(0.05, 0.1, 0.2),
            Vector3::new(0.55, 0.45, 0.3),
            Vector3::new(0.3, 0.8, 0.75),
        ];
        let scored = scorer.score(&kinds, &x, &geometry, &coulomb).unwrap();
        let h = 1e-6;
        for atom in 0..x.len() {
            for k in 0..3 {
                let mut plus = x.clone();
                let mut minus = x.clone();
                plus[atom][k] += h;
                minus[atom][k] -= h;
                let fd = (total(&scorer, &kinds, &plus, &geometry, &coulomb)
                    - total(&scorer, &kinds, &minus, &geometry, &coulomb))
                    / (2.0 * h);
                assert!(
                    (scored.gradient[atom][k] - fd).abs() < 1e-5 * fd.abs().max(1.0),
                    "atom {atom} axis {k}: analytic {} vs fd {fd}",
                    scored.gradient[atom][k]
                );
            }
        }
    }

    #[test]
    fn energy_is_invariant_under_lattice_translation() {
        let (scorer, geometry, coulomb) = setup(6.0, 5.0);
        let kinds = [0, 1];
        let x = [Vector3::new(0.1, 0.2, 0.3), Vector3::new(0.6, 0.5, 0.4)];
        let shifted = [x[0] + Vector3::new(1.0, 0.0, -1.0), x[1]];
        let a = total(&scorer, &kinds, &x, &geometry, &coulomb);
        let b = total(&scorer, &kinds, &shifted, &geometry, &coulomb);
        assert!((a - b).abs() < 1e-10);
    }

    #[test]
    fn overlapping_atoms_are_rejected() {
        let (scorer, geometry, coulomb) = setup(6.0, 5.0);
        let x = [Vector3::new(0.1, 0.1, 0.1), Vector3::new(0.1, 0.1, 0.1)];
        let result = scorer.score(&[0, 1], &x, &geometry, &coulomb);
        assert!(matches!(
            result,
            Err(ScoringError::Overlap {
                first: 0,
                second: 1,
                ..
            })
        ));
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let (scorer, geometry, coulomb) = setup(6.0, 5.0);
        let x = [Vector3::new(0.1, 0.1, 0.1)];
        assert!(matches!(
            scorer.score(&[0, 1], &x, &geometry, &coulomb),
            Err(ScoringError::LengthMismatch { .. })
        ));
        assert_eq!(
            scorer.score(&[5], &x, &geometry, &coulomb),
            Err(ScoringError::SpeciesIndexOutOfRange(5))
        );
    }
}
