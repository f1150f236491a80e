//! Client side of a QCFractal server: the datasets we build locally, the
//! requests they turn into, and the transports that carry them.

pub mod collection;
pub mod config;
pub mod fractal;
pub mod memory;
pub mod models;

pub use collection::{Collection, EntryRequest};
pub use config::ClientConfig;
pub use fractal::FractalClient;
pub use memory::MemoryPortal;
pub use models::*;

use crate::molecule::Molecule;

#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    #[error("entry {0:?} already exists in the dataset")]
    DuplicateEntry(String),
    #[error("specification {0:?} already exists in the dataset")]
    DuplicateSpecification(String),
    #[error("specification {0:?} is not registered in the dataset")]
    UnknownSpecification(String),
    #[error("entry {name:?} does not fit the dataset: {reason}")]
    InvalidEntry { name: String, reason: String },
    #[error("{kind} {name:?} was not found on the server")]
    NotFound { kind: DatasetKind, name: String },
    #[error("server rejected the {endpoint} request: {message}")]
    Remote { endpoint: String, message: String },
    #[error("client configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The server operations the submission pipelines need. Calls are awaited
/// one at a time.
#[allow(async_fn_in_trait)]
pub trait PortalClient {
    async fn get_collection(&self, kind: DatasetKind, name: &str)
        -> Result<Collection, PortalError>;

    /// Store a collection and return its id. Without `overwrite` a collection
    /// with the same kind and name must not exist yet.
    async fn add_collection(
        &self,
        collection: &Collection,
        overwrite: bool,
    ) -> Result<ObjectId, PortalError>;

    async fn add_keywords(&self, keywords: &[KeywordSet]) -> Result<Vec<ObjectId>, PortalError>;

    async fn add_molecules(&self, molecules: &[Molecule]) -> Result<Vec<ObjectId>, PortalError>;

    async fn add_service(
        &self,
        services: &[TorsionDriveInput],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError>;

    async fn add_procedure(
        &self,
        procedure: &OptimizationProcedure,
        molecules: &[ObjectId],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError>;
}
