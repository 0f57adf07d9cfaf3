use nalgebra::Vector3;

/// An ion in the periodic cell.
///
/// Positions are fractional (lattice) coordinates, so straining the cell moves
/// every atom affinely with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Name of the species this atom belongs to.
    pub species: String,
    /// Fractional coordinates in the current cell.
    pub position: Vector3<f64>,
    /// A fixed atom is never moved by the ionic relaxation.
    pub fixed: bool,
}

impl Atom {
    pub fn new(species: &str, position: Vector3<f64>) -> Self {
        Self {
            species: species.to_string(),
            position,
            fixed: false,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_movable_atom() {
        let atom = Atom::new("Na", Vector3::new(0.0, 0.5, 0.5));
        assert_eq!(atom.species, "Na");
        assert!(!atom.fixed);
        assert!(atom.fixed().fixed);
    }
}
