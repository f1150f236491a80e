use std::fmt;

use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};

use crate::indexing::{MoleculeIndex, TorsionEntry};
use crate::molecule::{check_connectivity, MoleculeError};
use crate::portal::{
    Collection, ComputeResponse, DatasetKind, EntryRequest, PortalClient, PortalError,
    TorsionDriveKeywords,
};

pub mod specification;

pub use specification::{
    optimization_specification, torsiondrive_specification, SpecificationRequest,
    DEFAULT_QM_BASIS, DEFAULT_QM_METHOD, DEFAULT_SPEC_NAME,
};

/// Successful additions between two saves.
pub const DEFAULT_BATCH_SIZE: usize = 30;
pub const DEFAULT_ENERGY_UPPER_LIMIT: f64 = 0.05;

#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error("connectivity check failed for {name}: {source}")]
    Connectivity {
        name: String,
        #[source]
        source: MoleculeError,
    },
}

#[derive(Debug, Clone)]
pub struct SubmissionOptions {
    pub spec_name: String,
    /// Save after this many successful additions, 0 saves only at the end.
    pub batch_size: usize,
    /// Run the connectivity check on the first molecule of every entry.
    pub check_connectivity: bool,
    /// Abort the run on a failed connectivity check instead of skipping.
    pub strict_connectivity: bool,
    pub show_progress: bool,
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self {
            spec_name: DEFAULT_SPEC_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            check_connectivity: false,
            strict_connectivity: false,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Added,
    SkippedDuplicate,
    Failed(String),
}

/// What happened to every entry of a run, in submission order.
#[derive(Debug, Default, Clone)]
pub struct SubmissionReport {
    pub outcomes: IndexMap<String, EntryOutcome>,
    pub saves: usize,
}

impl SubmissionReport {
    fn count(&self, f: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| f(o)).count()
    }

    pub fn added(&self) -> usize {
        self.count(|o| *o == EntryOutcome::Added)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == EntryOutcome::SkippedDuplicate)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&String, &String)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            EntryOutcome::Failed(reason) => Some((name, reason)),
            _ => None,
        })
    }
}

impl fmt::Display for SubmissionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} added, {} duplicates skipped, {} failed, {} saves",
            self.outcomes.len(),
            self.added(),
            self.skipped(),
            self.failed(),
            self.saves
        )
    }
}

pub fn optimization_requests(index: &MoleculeIndex) -> Vec<EntryRequest> {
    index
        .iter()
        .map(|(key, molecule, attributes)| EntryRequest {
            name: key.clone(),
            molecules: vec![molecule.clone()],
            attributes: attributes.clone(),
            td_keywords: None,
        })
        .collect()
}

pub fn torsiondrive_requests(
    entries: Vec<TorsionEntry>,
    energy_upper_limit: Option<f64>,
) -> Vec<EntryRequest> {
    entries
        .into_iter()
        .map(|entry| EntryRequest {
            name: entry.key,
            molecules: entry.initial_molecules,
            attributes: entry.attributes,
            td_keywords: Some(TorsionDriveKeywords {
                dihedrals: entry.dihedrals,
                grid_spacing: entry.grid_spacings,
                energy_upper_limit,
            }),
        })
        .collect()
}

pub struct Submitter<'a, C: PortalClient> {
    client: &'a C,
    options: SubmissionOptions,
}

impl<'a, C: PortalClient> Submitter<'a, C> {
    pub fn new(client: &'a C, options: SubmissionOptions) -> Self {
        Self { client, options }
    }

    /// Fetch the dataset when updating, otherwise start a new one with `spec`
    /// registered. A keyword set in `spec` is stored on the server first.
    pub async fn prepare_dataset(
        &self,
        kind: DatasetKind,
        name: &str,
        update: bool,
        spec: SpecificationRequest,
    ) -> Result<Collection, PortalError> {
        if update {
            let collection = self.client.get_collection(kind, name).await?;
            log::info!(
                "fetched {} {:?} with {} entries",
                kind,
                name,
                collection.records.len()
            );
            return Ok(collection);
        }

        log::info!("creating {} {:?}", kind, name);
        let mut collection = Collection::new(kind, name);

        let keywords = match &spec.keyword_set {
            Some(keyword_set) => self
                .client
                .add_keywords(std::slice::from_ref(keyword_set))
                .await?
                .into_iter()
                .next(),
            None => None,
        };

        collection.add_specification(spec.into_specification(keywords))?;
        Ok(collection)
    }

    /// Add every request in order. Duplicates are skipped, entries failing
    /// the connectivity check are skipped unless the check is strict, any
    /// other error ends the run. The collection is saved every
    /// `batch_size` additions and once more at the end.
    pub async fn submit(
        &self,
        collection: &mut Collection,
        requests: Vec<EntryRequest>,
    ) -> Result<SubmissionReport, SubmitError> {
        log::info!("adding {} entries to {}", requests.len(), collection.name);

        let progress = if self.options.show_progress {
            let bar = ProgressBar::new(requests.len() as u64);
            if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut report = SubmissionReport::default();
        let mut added = 0usize;

        for request in requests {
            let name = request.name.clone();
            progress.set_message(name.clone());

            let outcome = match self.connectivity(&request) {
                Err(source) if self.options.strict_connectivity => {
                    progress.abandon();
                    return Err(SubmitError::Connectivity { name, source });
                }
                Err(source) => {
                    log::warn!("skipping {}: {}", name, source);
                    EntryOutcome::Failed(source.to_string())
                }
                Ok(()) => match collection.add_entry(self.client, request).await {
                    Ok(()) => {
                        added += 1;
                        if self.options.batch_size > 0 && added % self.options.batch_size == 0 {
                            collection.save(self.client).await?;
                            report.saves += 1;
                        }
                        EntryOutcome::Added
                    }
                    Err(PortalError::DuplicateEntry(_)) => {
                        log::info!("skipping {}: already in the dataset", name);
                        EntryOutcome::SkippedDuplicate
                    }
                    Err(e) => {
                        progress.abandon();
                        return Err(e.into());
                    }
                },
            };

            report.outcomes.insert(name, outcome);
            progress.inc(1);
        }

        collection.save(self.client).await?;
        report.saves += 1;
        progress.finish_and_clear();

        log::info!("{}", report);
        for (name, reason) in report.failures() {
            log::warn!("{} was not submitted: {}", name, reason);
        }

        Ok(report)
    }

    fn connectivity(&self, request: &EntryRequest) -> Result<(), MoleculeError> {
        if !self.options.check_connectivity {
            return Ok(());
        }
        match request.molecules.first() {
            Some(molecule) => check_connectivity(molecule),
            None => Err(MoleculeError::Empty),
        }
    }

    pub async fn compute(
        &self,
        collection: &Collection,
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        log::info!(
            "submitting {} entries of {} under tag {:?}",
            collection.records.len(),
            self.options.spec_name,
            tag
        );
        collection
            .compute(self.client, &self.options.spec_name, tag)
            .await
    }
}
