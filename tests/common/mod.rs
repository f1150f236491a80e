#![allow(dead_code)]

use serde_json::{json, Value};

/// Staggered ethane in bohr: C-C 1.54 A, C-H 1.09 A.
pub fn ethane() -> Value {
    json!({
        "symbols": ["C", "C", "H", "H", "H", "H", "H", "H"],
        "geometry": [
            0.0, 0.0, -1.4557,
            0.0, 0.0, 1.4557,
            1.942, 0.0, -2.1427,
            -0.971, 1.682, -2.1427,
            -0.971, -1.682, -2.1427,
            -1.942, 0.0, 2.1427,
            0.971, 1.682, 2.1427,
            0.971, -1.682, 2.1427
        ],
        "molecular_charge": 0.0,
        "molecular_multiplicity": 1
    })
}

/// Ethane with every hydrogen pulled far away from the carbons.
pub fn fragmented_ethane() -> Value {
    json!({
        "symbols": ["C", "C", "H", "H", "H", "H", "H", "H"],
        "geometry": [
            0.0, 0.0, -1.4557,
            0.0, 0.0, 1.4557,
            20.0, 0.0, 0.0,
            -20.0, 0.0, 0.0,
            0.0, 20.0, 0.0,
            0.0, -20.0, 0.0,
            20.0, 20.0, 0.0,
            -20.0, -20.0, 0.0
        ]
    })
}

/// Ethanol heavy atoms only, enough for indexing tests.
pub fn ethanol_conformer(shift: f64) -> Value {
    json!({
        "symbols": ["C", "C", "O"],
        "geometry": [0.0, 0.0, 0.0, 2.87, 0.0, 0.0, 3.8, 2.5, shift]
    })
}

pub fn torsion(key: &str, molecule: Value, smiles: &str) -> (String, Value) {
    (
        key.to_string(),
        json!({
            "initial_molecules": [molecule],
            "atom_indices": [[2, 0, 1, 5]],
            "attributes": {"canonical_isomeric_smiles": smiles}
        }),
    )
}
