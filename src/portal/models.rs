use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::input::Attributes;

pub type ObjectId = String;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    #[serde(rename = "OptimizationDataset")]
    Optimization,
    #[serde(rename = "TorsionDriveDataset")]
    TorsionDrive,
}

impl DatasetKind {
    /// Collection type name as the server spells it.
    pub fn collection_type(&self) -> &'static str {
        match self {
            DatasetKind::Optimization => "optimizationdataset",
            DatasetKind::TorsionDrive => "torsiondrivedataset",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetKind::Optimization => write!(f, "OptimizationDataset"),
            DatasetKind::TorsionDrive => write!(f, "TorsionDriveDataset"),
        }
    }
}

/// Program keywords stored on the server and referenced by id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeywordSet {
    pub values: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OptimizationSpecification {
    pub program: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub keywords: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QCSpecification {
    pub driver: String,
    pub method: String,
    pub basis: Option<String>,
    pub program: String,
    #[serde(default)]
    pub keywords: Option<ObjectId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Specification {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub optimization_spec: OptimizationSpecification,
    pub qc_spec: QCSpecification,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TorsionDriveKeywords {
    pub dihedrals: Vec<[usize; 4]>,
    pub grid_spacing: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_upper_limit: Option<f64>,
}

/// A dataset entry as stored in the collection, molecules by id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub initial_molecules: Vec<ObjectId>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub td_keywords: Option<TorsionDriveKeywords>,
}

/// Service request for one torsion scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TorsionDriveInput {
    pub keywords: TorsionDriveKeywords,
    pub optimization_spec: OptimizationSpecification,
    pub qc_spec: QCSpecification,
    pub initial_molecule: Vec<ObjectId>,
}

/// Procedure request applied to a batch of molecules.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OptimizationProcedure {
    pub program: String,
    pub keywords: Map<String, Value>,
    pub qc_spec: QCSpecification,
}

/// Acknowledgment of a compute request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ComputeResponse {
    pub ids: Vec<Option<ObjectId>>,
    pub submitted: Vec<ObjectId>,
    pub existing: Vec<ObjectId>,
}

impl std::fmt::Display for ComputeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ComputeResponse(nsubmitted={} nexisting={})",
            self.submitted.len(),
            self.existing.len()
        )
    }
}
