use serde_json::{json, Map, Value};

use crate::portal::{KeywordSet, OptimizationSpecification, QCSpecification, Specification};

pub const DEFAULT_SPEC_NAME: &str = "default";
pub const DEFAULT_QM_METHOD: &str = "b3lyp-d3bj";
pub const DEFAULT_QM_BASIS: &str = "dzvp";

/// A specification to register, plus the keyword set its QC part refers to
/// once the set has an id on the server.
#[derive(Debug, Clone)]
pub struct SpecificationRequest {
    pub name: String,
    pub description: Option<String>,
    pub optimization_spec: OptimizationSpecification,
    pub qc_spec: QCSpecification,
    pub keyword_set: Option<KeywordSet>,
}

impl SpecificationRequest {
    pub fn into_specification(self, keywords: Option<String>) -> Specification {
        let mut qc_spec = self.qc_spec;
        if keywords.is_some() {
            qc_spec.keywords = keywords;
        }

        Specification {
            name: self.name,
            description: self.description,
            optimization_spec: self.optimization_spec,
            qc_spec,
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn psi4_gradient(method: &str, basis: &str) -> QCSpecification {
    QCSpecification {
        driver: "gradient".to_string(),
        method: method.to_string(),
        basis: Some(basis.to_string()),
        program: "psi4".to_string(),
        keywords: None,
    }
}

/// geomeTRIC with default settings driving psi4 gradients.
pub fn optimization_specification(name: &str, method: &str, basis: &str) -> SpecificationRequest {
    SpecificationRequest {
        name: name.to_string(),
        description: None,
        optimization_spec: OptimizationSpecification {
            program: "geometric".to_string(),
            keywords: Map::new(),
        },
        qc_spec: psi4_gradient(method, basis),
        keyword_set: None,
    }
}

/// The standard torsiondrive setup: constrained geomeTRIC optimizations in
/// TRIC coordinates, psi4 B3LYP-D3BJ/DZVP gradients with bond orders and
/// multipoles requested.
pub fn torsiondrive_specification(name: &str) -> SpecificationRequest {
    SpecificationRequest {
        name: name.to_string(),
        description: Some("Standard OpenFF torsiondrive specification.".to_string()),
        optimization_spec: OptimizationSpecification {
            program: "geometric".to_string(),
            keywords: object(json!({
                "coordsys": "tric",
                "enforce": 0.1,
                "reset": true,
                "qccnv": true,
                "epsilon": 0.0,
            })),
        },
        qc_spec: psi4_gradient("B3LYP-d3bj", "dzvp"),
        keyword_set: Some(KeywordSet {
            values: object(json!({
                "maxiter": 200,
                "scf_properties": [
                    "dipole",
                    "quadrupole",
                    "wiberg_lowdin_indices",
                    "mayer_indices",
                ],
            })),
            comments: None,
        }),
    }
}
