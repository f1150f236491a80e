use std::collections::HashMap;
use std::sync::Mutex;

use crate::molecule::Molecule;

use super::{
    Collection, ComputeResponse, DatasetKind, KeywordSet, ObjectId, OptimizationProcedure,
    PortalClient, PortalError, TorsionDriveInput,
};

#[derive(Debug, Default)]
struct State {
    next_id: usize,
    collections: HashMap<(DatasetKind, String), Collection>,
    keywords: Vec<(ObjectId, KeywordSet)>,
    molecules: Vec<(ObjectId, Molecule)>,
    services: Vec<(Option<String>, TorsionDriveInput)>,
    procedures: Vec<(Option<String>, OptimizationProcedure, Vec<ObjectId>)>,
    saves: usize,
    molecule_calls: usize,
}

impl State {
    fn next_id(&mut self) -> ObjectId {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

/// A server living in this process. Backs `--dry-run` and the tests.
#[derive(Debug, Default)]
pub struct MemoryPortal {
    state: Mutex<State>,
}

impl MemoryPortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored collection, as if an earlier run had saved it.
    pub fn with_collection(self, mut collection: Collection) -> Self {
        {
            let mut state = self.lock();
            let id = state.next_id();
            collection.id = Some(id);
            state
                .collections
                .insert((collection.kind(), collection.name.clone()), collection);
        }
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // a panicking test may poison the lock, the state is still readable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn collection(&self, kind: DatasetKind, name: &str) -> Option<Collection> {
        self.lock().collections.get(&(kind, name.to_string())).cloned()
    }

    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    pub fn molecule_calls(&self) -> usize {
        self.lock().molecule_calls
    }

    pub fn keyword_sets(&self) -> Vec<(ObjectId, KeywordSet)> {
        self.lock().keywords.clone()
    }

    pub fn services(&self) -> Vec<(Option<String>, TorsionDriveInput)> {
        self.lock().services.clone()
    }

    pub fn procedures(&self) -> Vec<(Option<String>, OptimizationProcedure, Vec<ObjectId>)> {
        self.lock().procedures.clone()
    }
}

impl PortalClient for MemoryPortal {
    async fn get_collection(
        &self,
        kind: DatasetKind,
        name: &str,
    ) -> Result<Collection, PortalError> {
        self.collection(kind, name)
            .ok_or_else(|| PortalError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    async fn add_collection(
        &self,
        collection: &Collection,
        overwrite: bool,
    ) -> Result<ObjectId, PortalError> {
        let mut state = self.lock();
        let key = (collection.kind(), collection.name.clone());

        let existing_id = state
            .collections
            .get(&key)
            .map(|c| c.id.clone().unwrap_or_default());

        let id = match (existing_id, overwrite) {
            (Some(id), true) => id,
            (Some(_), false) => {
                return Err(PortalError::Remote {
                    endpoint: "collection".to_string(),
                    message: format!("{} {:?} already exists", key.0, key.1),
                })
            }
            (None, _) => state.next_id(),
        };

        // stored as it would travel over the wire
        let mut stored: Collection = serde_json::from_value(serde_json::to_value(collection)?)?;
        stored.id = Some(id.clone());
        state.collections.insert(key, stored);
        state.saves += 1;
        Ok(id)
    }

    async fn add_keywords(&self, keywords: &[KeywordSet]) -> Result<Vec<ObjectId>, PortalError> {
        let mut state = self.lock();
        let ids = keywords
            .iter()
            .map(|kw| {
                let id = state.next_id();
                state.keywords.push((id.clone(), kw.clone()));
                id
            })
            .collect();
        Ok(ids)
    }

    async fn add_molecules(&self, molecules: &[Molecule]) -> Result<Vec<ObjectId>, PortalError> {
        let mut state = self.lock();
        state.molecule_calls += 1;

        let ids = molecules
            .iter()
            .map(|molecule| {
                if let Some((id, _)) = state.molecules.iter().find(|(_, m)| m == molecule) {
                    return id.clone();
                }
                let id = state.next_id();
                state.molecules.push((id.clone(), molecule.clone()));
                id
            })
            .collect();
        Ok(ids)
    }

    async fn add_service(
        &self,
        services: &[TorsionDriveInput],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        let mut state = self.lock();
        let mut response = ComputeResponse::default();

        for service in services {
            let existing = state
                .services
                .iter()
                .position(|(_, s)| s == service)
                .map(|p| (p + 1).to_string());
            match existing {
                Some(id) => {
                    response.ids.push(Some(id.clone()));
                    response.existing.push(id);
                }
                None => {
                    state
                        .services
                        .push((tag.map(str::to_string), service.clone()));
                    let id = state.services.len().to_string();
                    response.ids.push(Some(id.clone()));
                    response.submitted.push(id);
                }
            }
        }

        Ok(response)
    }

    async fn add_procedure(
        &self,
        procedure: &OptimizationProcedure,
        molecules: &[ObjectId],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        let mut state = self.lock();
        state.procedures.push((
            tag.map(str::to_string),
            procedure.clone(),
            molecules.to_vec(),
        ));

        let ids: Vec<ObjectId> = molecules
            .iter()
            .map(|m| format!("opt-{}", m))
            .collect();
        Ok(ComputeResponse {
            ids: ids.iter().cloned().map(Some).collect(),
            submitted: ids,
            existing: Vec::new(),
        })
    }
}
