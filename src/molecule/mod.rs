use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod connectivity;

pub use connectivity::{check_connectivity, guess_connectivity, DEFAULT_BOND_THRESHOLD};

pub const BOHR_TO_ANGSTROM: f64 = 0.529_177_210_67;

#[derive(thiserror::Error, Debug)]
pub enum MoleculeError {
    #[error("molecule has no atoms")]
    Empty,
    #[error("geometry has {geometry} values but {atoms} atoms need {expected}")]
    GeometryShape {
        atoms: usize,
        geometry: usize,
        expected: usize,
    },
    #[error("only {} bonds guessed for {atoms} atoms: {bonds:?}", .bonds.len())]
    Fragmented {
        atoms: usize,
        bonds: Vec<(usize, usize)>,
    },
    #[error("no covalent radius known for element {0:?}")]
    UnknownElement(String),
    #[error("failed to parse molecule: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A QCSchema molecule. Only `symbols` and `geometry` are interpreted, every
/// other field is carried through to the server untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Molecule {
    pub symbols: Vec<String>,
    /// Flat cartesian coordinates in bohr.
    pub geometry: Vec<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Molecule {
    pub fn from_value(value: Value) -> Result<Self, MoleculeError> {
        let molecule: Molecule = serde_json::from_value(value)?;
        molecule.validate()?;
        Ok(molecule)
    }

    pub fn validate(&self) -> Result<(), MoleculeError> {
        if self.symbols.is_empty() {
            return Err(MoleculeError::Empty);
        }

        let expected = self.symbols.len() * 3;
        if self.geometry.len() != expected {
            return Err(MoleculeError::GeometryShape {
                atoms: self.symbols.len(),
                geometry: self.geometry.len(),
                expected,
            });
        }

        Ok(())
    }

    pub fn atom_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn position(&self, atom: usize) -> [f64; 3] {
        let offset = atom * 3;
        [
            self.geometry[offset],
            self.geometry[offset + 1],
            self.geometry[offset + 2],
        ]
    }

    /// Distance between two atoms in angstrom.
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        let (pa, pb) = (self.position(a), self.position(b));
        let squared: f64 = pa.iter().zip(pb.iter()).map(|(x, y)| (x - y).powi(2)).sum();
        squared.sqrt() * BOHR_TO_ANGSTROM
    }
}
