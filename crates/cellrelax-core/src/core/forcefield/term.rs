use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Energy accumulator shared by every lattice-dependent collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub pair: f64,
    pub coulomb: f64,
    pub electronic: f64,
}

impl EnergyTerm {
    pub fn new(pair: f64, coulomb: f64, electronic: f64) -> Self {
        Self {
            pair,
            coulomb,
            electronic,
        }
    }

    /// The free energy minimized by both the ionic and the lattice loops.
    #[inline]
    pub fn total(&self) -> f64 {
        self.pair + self.coulomb + self.electronic
    }

    /// Component-wise sum of the ionic contributions only.
    #[inline]
    pub fn ionic(&self) -> f64 {
        self.pair + self.coulomb
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            pair: self.pair + rhs.pair,
            coulomb: self.coulomb + rhs.coulomb,
            electronic: self.electronic + rhs.electronic,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.pair += rhs.pair;
        self.coulomb += rhs.coulomb;
        self.electronic += rhs.electronic;
    }
}

impl Sum for EnergyTerm {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, term| acc + term)
    }
}
