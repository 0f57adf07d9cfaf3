use super::potentials::{self, PairValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(untagged, rename_all_fields = "kebab-case")]
pub enum VdwParam {
    Buckingham {
        radius: f64,
        well_depth: f64,
        scale: f64,
    },
    LennardJones {
        radius: f64,
        well_depth: f64,
    },
}

impl VdwParam {
    fn components(&self) -> (f64, f64, f64) {
        match *self {
            VdwParam::Buckingham {
                radius,
                well_depth,
                scale,
            } => (radius, well_depth, scale),
            VdwParam::LennardJones { radius, well_depth } => (radius, well_depth, 0.0),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Species {
    pub name: String,
    #[serde(default)]
    pub charge: f64,
    pub vdw: VdwParam,
}

/// Mixed short-range parameters for one species pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairParam {
    pub r_min: f64,
    pub well_depth: f64,
    pub scale: f64,
    pub charge_product: f64,
}

impl PairParam {
    /// Arithmetic-mean radius and geometric-mean well depth. The pair is exp-6
    /// only when both species are, with the mean scale.
    pub fn mix(a: &Species, b: &Species) -> Self {
        let (r1, d1, s1) = a.vdw.components();
        let (r2, d2, s2) = b.vdw.components();
        Self {
            r_min: (r1 + r2) / 2.0,
            well_depth: (d1 * d2).sqrt(),
            scale: if s1 > 0.0 && s2 > 0.0 {
                (s1 + s2) / 2.0
            } else {
                0.0
            },
            charge_product: a.charge * b.charge,
        }
    }

    #[inline]
    pub fn vdw(&self, dist: f64) -> PairValue {
        if self.scale > 0.0 {
            potentials::buckingham_exp_6(dist, self.r_min, self.well_depth, self.scale)
        } else {
            potentials::lennard_jones_12_6(dist, self.r_min, self.well_depth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argon() -> Species {
        Species {
            name: "Ar".to_string(),
            charge: 0.0,
            vdw: VdwParam::LennardJones {
                radius: 3.8,
                well_depth: 0.0104,
            },
        }
    }

    #[test]
    fn untagged_vdw_params_deserialize_by_shape() {
        let lj: VdwParam = toml::from_str("radius = 3.2\nwell-depth = 0.05").unwrap();
        assert_eq!(
            lj,
            VdwParam::LennardJones {
                radius: 3.2,
                well_depth: 0.05
            }
        );
        let exp6: VdwParam = toml::from_str("radius = 3.5\nwell-depth = 0.1\nscale = 12.0").unwrap();
        assert_eq!(
            exp6,
            VdwParam::Buckingham {
                radius: 3.5,
                well_depth: 0.1,
                scale: 12.0
            }
        );
    }

    #[test]
    fn mixing_uses_arithmetic_radius_and_geometric_depth() {
        let a = argon();
        let b = Species {
            name: "Na".to_string(),
            charge: 1.0,
            vdw: VdwParam::Buckingham {
                radius: 3.0,
                well_depth: 0.0416,
                scale: 12.0,
            },
        };
        let mixed = PairParam::mix(&a, &b);
        assert!((mixed.r_min - 3.4).abs() < 1e-12);
        assert!((mixed.well_depth - (0.0104f64 * 0.0416).sqrt()).abs() < 1e-12);
        assert_eq!(mixed.scale, 0.0);
        assert_eq!(mixed.charge_product, 0.0);
    }

    #[test]
    fn lennard_jones_pair_is_minimal_at_mixed_radius() {
        let mixed = PairParam::mix(&argon(), &argon());
        let value = mixed.vdw(3.8);
        assert!((value.energy + 0.0104).abs() < 1e-12);
        assert!(value.derivative.abs() < 1e-12);
    }
}
