use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod archive;

pub use archive::{archive_path, extract_from_archive};

/// Identifier name to value, e.g. `canonical_isomeric_smiles`.
pub type Attributes = IndexMap<String, Value>;

/// One entry of a torsion selection, keyed by its canonical torsion index.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TorsionRecord {
    pub initial_molecules: Vec<Value>,
    pub atom_indices: Vec<Vec<usize>>,
    #[serde(default)]
    pub attributes: Attributes,
}

pub type TorsionInput = IndexMap<String, TorsionRecord>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MoleculeRecord {
    pub initial_molecules: Vec<Value>,
    pub cmiles_identifiers: Attributes,
}

/// Parse a JSON file, extracting it from `<path>.tar.gz` first when the
/// file itself is missing.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> eyre::Result<T> {
    let path = path.as_ref();

    if !path.exists() {
        extract_from_archive(path)?;
    }

    log::info!("reading {}", path.display());

    let reader = BufReader::new(File::open(path)?);
    let parsed = serde_json::from_reader(reader)
        .map_err(|e| eyre::eyre!("failed to parse {}: {}", path.display(), e))?;

    Ok(parsed)
}

pub fn read_selected_torsions(path: impl AsRef<Path>) -> eyre::Result<TorsionInput> {
    let torsions: TorsionInput = load_json(path)?;
    log::info!("found {} torsions", torsions.len());
    Ok(torsions)
}

pub fn read_molecule_records(path: impl AsRef<Path>) -> eyre::Result<Vec<MoleculeRecord>> {
    let records: Vec<MoleculeRecord> = load_json(path)?;
    log::info!("found {} molecule records", records.len());
    Ok(records)
}
