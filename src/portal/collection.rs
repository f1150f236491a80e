use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::input::Attributes;
use crate::molecule::Molecule;

use super::{
    ComputeResponse, DatasetKind, Entry, ObjectId, OptimizationProcedure, PortalClient,
    PortalError, Specification, TorsionDriveInput, TorsionDriveKeywords,
};

/// An entry waiting to be added, molecules still in full.
#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub name: String,
    pub molecules: Vec<Molecule>,
    pub attributes: Attributes,
    pub td_keywords: Option<TorsionDriveKeywords>,
}

/// Local handle on a dataset. Entries accumulate here and reach the server
/// on `save`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Collection {
    #[serde(default)]
    pub id: Option<ObjectId>,
    pub name: String,
    pub collection: DatasetKind,
    #[serde(default)]
    pub specs: IndexMap<String, Specification>,
    #[serde(default)]
    pub records: IndexMap<String, Entry>,
    #[serde(skip)]
    unsaved: usize,
}

impl Collection {
    pub fn new(kind: DatasetKind, name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            collection: kind,
            specs: IndexMap::new(),
            records: IndexMap::new(),
            unsaved: 0,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.collection
    }

    /// Changes made since the last save.
    pub fn unsaved(&self) -> usize {
        self.unsaved
    }

    pub fn contains_entry(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn add_specification(&mut self, spec: Specification) -> Result<(), PortalError> {
        if self.specs.contains_key(&spec.name) {
            return Err(PortalError::DuplicateSpecification(spec.name));
        }

        log::debug!("{}: registered specification {}", self.name, spec.name);
        self.specs.insert(spec.name.clone(), spec);
        self.unsaved += 1;
        Ok(())
    }

    fn check_entry(&self, request: &EntryRequest) -> Result<(), PortalError> {
        let invalid = |reason: &str| PortalError::InvalidEntry {
            name: request.name.clone(),
            reason: reason.to_string(),
        };

        match (self.collection, &request.td_keywords) {
            (_, _) if request.molecules.is_empty() => Err(invalid("no molecules")),
            (DatasetKind::TorsionDrive, None) => Err(invalid("torsion scan keywords missing")),
            (DatasetKind::TorsionDrive, Some(td)) if td.dihedrals.len() != td.grid_spacing.len() => {
                Err(invalid("one grid spacing is needed per dihedral"))
            }
            (DatasetKind::Optimization, Some(_)) => {
                Err(invalid("optimization entries take no torsion keywords"))
            }
            (DatasetKind::Optimization, None) if request.molecules.len() != 1 => {
                Err(invalid("optimization entries take exactly one molecule"))
            }
            _ => Ok(()),
        }
    }

    /// Register the entry's molecules with the server and record the entry.
    /// A name already present fails with `PortalError::DuplicateEntry`.
    pub async fn add_entry<C: PortalClient>(
        &mut self,
        client: &C,
        request: EntryRequest,
    ) -> Result<(), PortalError> {
        if self.records.contains_key(&request.name) {
            return Err(PortalError::DuplicateEntry(request.name));
        }
        self.check_entry(&request)?;

        let molecule_ids = client.add_molecules(&request.molecules).await?;

        let entry = Entry {
            name: request.name.clone(),
            initial_molecules: molecule_ids,
            attributes: request.attributes,
            td_keywords: request.td_keywords,
        };
        self.records.insert(request.name, entry);
        self.unsaved += 1;
        Ok(())
    }

    /// Upload the collection. The first save creates it on the server, later
    /// saves overwrite. Saving with nothing pending is allowed.
    pub async fn save<C: PortalClient>(&mut self, client: &C) -> Result<ObjectId, PortalError> {
        let id = client.add_collection(self, self.id.is_some()).await?;

        log::debug!(
            "{}: saved {} pending changes as {}",
            self.name,
            self.unsaved,
            id
        );
        self.id = Some(id.clone());
        self.unsaved = 0;
        Ok(id)
    }

    /// Submit every entry for computation under `spec_name`.
    pub async fn compute<C: PortalClient>(
        &self,
        client: &C,
        spec_name: &str,
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        let spec = self
            .specs
            .get(spec_name)
            .ok_or_else(|| PortalError::UnknownSpecification(spec_name.to_string()))?;

        match self.collection {
            DatasetKind::TorsionDrive => {
                let services = self
                    .records
                    .values()
                    .map(|entry| {
                        let keywords =
                            entry
                                .td_keywords
                                .clone()
                                .ok_or_else(|| PortalError::InvalidEntry {
                                    name: entry.name.clone(),
                                    reason: "torsion scan keywords missing".to_string(),
                                })?;
                        Ok(TorsionDriveInput {
                            keywords,
                            optimization_spec: spec.optimization_spec.clone(),
                            qc_spec: spec.qc_spec.clone(),
                            initial_molecule: entry.initial_molecules.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, PortalError>>()?;

                client.add_service(&services, tag).await
            }
            DatasetKind::Optimization => {
                let procedure = OptimizationProcedure {
                    program: spec.optimization_spec.program.clone(),
                    keywords: spec.optimization_spec.keywords.clone(),
                    qc_spec: spec.qc_spec.clone(),
                };
                let molecules = self
                    .records
                    .values()
                    .flat_map(|entry| entry.initial_molecules.iter().cloned())
                    .collect::<Vec<_>>();

                client.add_procedure(&procedure, &molecules, tag).await
            }
        }
    }
}
