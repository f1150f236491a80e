use std::collections::HashMap;

use indexmap::IndexMap;

use crate::input::{Attributes, MoleculeRecord};
use crate::molecule::{Molecule, MoleculeError};

pub mod torsion;

pub use torsion::{index_torsions, TorsionEntry, DEFAULT_GRID_SPACING};

pub const DEFAULT_ID_FIELD: &str = "canonical_isomeric_smiles";

#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    #[error("record {record} has no {field:?} identifier")]
    MissingIdentifier { record: usize, field: String },
    #[error("identifier {field:?} of record {record} is not a string")]
    InvalidIdentifier { record: usize, field: String },
    #[error("multiple molecules have the same index {0:?}")]
    DuplicateKey(String),
    #[error("{key}: {reason}")]
    InvalidEntry { key: String, reason: String },
    #[error("{key}: {source}")]
    Molecule {
        key: String,
        #[source]
        source: MoleculeError,
    },
}

/// Molecules and their attributes under the same unique keys, in the order
/// the records were read. Both maps are only filled through `index_molecules`,
/// so they always hold the same keys.
#[derive(Debug, Default, Clone)]
pub struct MoleculeIndex {
    molecules: IndexMap<String, Molecule>,
    attributes: IndexMap<String, Attributes>,
}

impl MoleculeIndex {
    pub fn molecules(&self) -> &IndexMap<String, Molecule> {
        &self.molecules
    }

    pub fn attributes(&self) -> &IndexMap<String, Attributes> {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Molecule, &Attributes)> {
        self.molecules
            .iter()
            .map(|(key, molecule)| (key, molecule, &self.attributes[key]))
    }
}

/// Key every conformer by `"{identifier}-{n}"`, where `n` counts the
/// conformers seen so far under the same identifier.
pub fn index_molecules(
    records: &[MoleculeRecord],
    id_field: &str,
) -> Result<MoleculeIndex, IndexError> {
    let mut index = MoleculeIndex::default();
    let mut counters: HashMap<&str, usize> = HashMap::new();

    for (record_number, record) in records.iter().enumerate() {
        let base = record
            .cmiles_identifiers
            .get(id_field)
            .ok_or_else(|| IndexError::MissingIdentifier {
                record: record_number,
                field: id_field.to_string(),
            })?
            .as_str()
            .ok_or_else(|| IndexError::InvalidIdentifier {
                record: record_number,
                field: id_field.to_string(),
            })?;

        for value in &record.initial_molecules {
            let counter = counters.entry(base).or_insert(0);
            let key = format!("{}-{}", base, counter);
            *counter += 1;

            let molecule =
                Molecule::from_value(value.clone()).map_err(|source| IndexError::Molecule {
                    key: key.clone(),
                    source,
                })?;

            if index.molecules.contains_key(&key) {
                return Err(IndexError::DuplicateKey(key));
            }

            log::debug!("indexed {}", key);
            index.molecules.insert(key.clone(), molecule);
            index
                .attributes
                .insert(key, record.cmiles_identifiers.clone());
        }
    }

    Ok(index)
}
