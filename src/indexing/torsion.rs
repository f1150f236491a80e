use crate::input::{Attributes, TorsionInput};
use crate::molecule::Molecule;

use super::IndexError;

/// Degrees between grid points of a torsion scan.
pub const DEFAULT_GRID_SPACING: i64 = 15;

#[derive(Debug, Clone)]
pub struct TorsionEntry {
    pub key: String,
    pub initial_molecules: Vec<Molecule>,
    pub dihedrals: Vec<[usize; 4]>,
    pub grid_spacings: Vec<i64>,
    pub attributes: Attributes,
}

pub fn index_torsions(
    input: &TorsionInput,
    grid_spacing: i64,
) -> Result<Vec<TorsionEntry>, IndexError> {
    input
        .iter()
        .map(|(key, record)| {
            let invalid = |reason: String| IndexError::InvalidEntry {
                key: key.clone(),
                reason,
            };

            if record.initial_molecules.is_empty() {
                return Err(invalid("no initial molecules".to_string()));
            }
            if record.atom_indices.is_empty() {
                return Err(invalid("no atom indices".to_string()));
            }

            let initial_molecules = record
                .initial_molecules
                .iter()
                .map(|value| Molecule::from_value(value.clone()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| IndexError::Molecule {
                    key: key.clone(),
                    source,
                })?;

            let atoms = initial_molecules[0].atom_count();
            let dihedrals = record
                .atom_indices
                .iter()
                .map(|indices| {
                    let dihedral: [usize; 4] = indices.as_slice().try_into().map_err(|_| {
                        invalid(format!("dihedral {:?} does not have 4 atoms", indices))
                    })?;
                    match dihedral.iter().find(|i| **i >= atoms) {
                        Some(out_of_range) => Err(invalid(format!(
                            "atom {} of dihedral {:?} is out of range for {} atoms",
                            out_of_range, indices, atoms
                        ))),
                        None => Ok(dihedral),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(TorsionEntry {
                key: key.clone(),
                grid_spacings: vec![grid_spacing; dihedrals.len()],
                initial_molecules,
                dihedrals,
                attributes: record.attributes.clone(),
            })
        })
        .collect()
}
