mod common;

use qcsubmit::indexing::{index_molecules, index_torsions, DEFAULT_GRID_SPACING, DEFAULT_ID_FIELD};
use qcsubmit::input::{MoleculeRecord, TorsionInput};
use qcsubmit::molecule::Molecule;
use qcsubmit::portal::{
    Collection, ComputeResponse, DatasetKind, KeywordSet, MemoryPortal, ObjectId,
    OptimizationProcedure, PortalClient, PortalError, TorsionDriveInput,
};
use qcsubmit::submission::*;
use serde_json::json;

fn torsion_input(entries: Vec<(String, serde_json::Value)>) -> TorsionInput {
    let map: serde_json::Map<_, _> = entries.into_iter().collect();
    serde_json::from_value(serde_json::Value::Object(map)).unwrap()
}

fn torsion_options() -> SubmissionOptions {
    SubmissionOptions {
        check_connectivity: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn single_torsion_is_added_once() -> eyre::Result<()> {
    let input = torsion_input(vec![(
        "rot_1".to_string(),
        json!({
            "initial_molecules": [common::ethane()],
            "atom_indices": [[0, 1, 2, 3]],
            "attributes": {"canonical_isomeric_smiles": "CC"}
        }),
    )]);
    let entries = index_torsions(&input, DEFAULT_GRID_SPACING)?;
    let requests = torsiondrive_requests(entries, Some(DEFAULT_ENERGY_UPPER_LIMIT));

    let portal = MemoryPortal::new();
    let submitter = Submitter::new(&portal, torsion_options());
    let mut dataset = submitter
        .prepare_dataset(
            DatasetKind::TorsionDrive,
            "ethane scan",
            false,
            torsiondrive_specification(DEFAULT_SPEC_NAME),
        )
        .await?;
    let report = submitter.submit(&mut dataset, requests).await?;

    assert_eq!(report.added(), 1);
    assert_eq!(portal.molecule_calls(), 1);

    let stored = portal
        .collection(DatasetKind::TorsionDrive, "ethane scan")
        .expect("dataset saved");
    let entry = &stored.records["rot_1"];
    let td = entry.td_keywords.as_ref().unwrap();
    assert_eq!(td.dihedrals, vec![[0, 1, 2, 3]]);
    assert_eq!(td.grid_spacing, vec![15]);
    assert_eq!(td.energy_upper_limit, Some(0.05));
    assert_eq!(entry.attributes["canonical_isomeric_smiles"], json!("CC"));
    Ok(())
}

#[tokio::test]
async fn keyword_set_is_registered_before_the_specification() -> eyre::Result<()> {
    let portal = MemoryPortal::new();
    let submitter = Submitter::new(&portal, torsion_options());

    let dataset = submitter
        .prepare_dataset(
            DatasetKind::TorsionDrive,
            "scan",
            false,
            torsiondrive_specification(DEFAULT_SPEC_NAME),
        )
        .await?;

    let keyword_sets = portal.keyword_sets();
    assert_eq!(keyword_sets.len(), 1);
    assert_eq!(keyword_sets[0].1.values["maxiter"], json!(200));

    let spec = &dataset.specs[DEFAULT_SPEC_NAME];
    assert_eq!(spec.qc_spec.keywords.as_ref(), Some(&keyword_sets[0].0));
    assert_eq!(spec.optimization_spec.program, "geometric");
    assert_eq!(spec.optimization_spec.keywords["coordsys"], json!("tric"));
    Ok(())
}

#[tokio::test]
async fn duplicates_are_skipped_and_not_counted() -> eyre::Result<()> {
    let input = torsion_input(vec![
        common::torsion("rot_1", common::ethane(), "CC"),
        common::torsion("rot_2", common::ethane(), "CC"),
    ]);
    let requests = torsiondrive_requests(index_torsions(&input, 15)?, None);

    // an earlier run already stored rot_1
    let portal = MemoryPortal::new();
    let seed_submitter = Submitter::new(&portal, torsion_options());
    let mut seed = seed_submitter
        .prepare_dataset(
            DatasetKind::TorsionDrive,
            "scan",
            false,
            torsiondrive_specification(DEFAULT_SPEC_NAME),
        )
        .await?;
    seed_submitter
        .submit(&mut seed, requests[..1].to_vec())
        .await?;

    let options = SubmissionOptions {
        batch_size: 1,
        ..torsion_options()
    };
    let submitter = Submitter::new(&portal, options);
    let mut dataset = submitter
        .prepare_dataset(
            DatasetKind::TorsionDrive,
            "scan",
            true,
            torsiondrive_specification(DEFAULT_SPEC_NAME),
        )
        .await?;
    let saves_before = portal.saves();
    let report = submitter.submit(&mut dataset, requests).await?;

    assert_eq!(report.outcomes["rot_1"], EntryOutcome::SkippedDuplicate);
    assert_eq!(report.outcomes["rot_2"], EntryOutcome::Added);
    assert_eq!(report.added(), 1);
    // one batch save for rot_2 plus the final one
    assert_eq!(portal.saves() - saves_before, 2);
    assert_eq!(
        portal
            .collection(DatasetKind::TorsionDrive, "scan")
            .unwrap()
            .records
            .len(),
        2
    );
    Ok(())
}

#[tokio::test]
async fn fragmented_torsion_is_not_submitted() -> eyre::Result<()> {
    let input = torsion_input(vec![
        common::torsion("broken", common::fragmented_ethane(), "CC"),
        common::torsion("fine", common::ethane(), "CC"),
    ]);
    let requests = torsiondrive_requests(index_torsions(&input, 15)?, None);

    let portal = MemoryPortal::new();
    let submitter = Submitter::new(&portal, torsion_options());
    let mut dataset = Collection::new(DatasetKind::TorsionDrive, "scan");
    let report = submitter.submit(&mut dataset, requests).await?;

    assert!(matches!(report.outcomes["broken"], EntryOutcome::Failed(_)));
    assert_eq!(report.outcomes["fine"], EntryOutcome::Added);
    assert!(!dataset.contains_entry("broken"));
    assert_eq!(portal.molecule_calls(), 1);
    assert_eq!(report.failures().count(), 1);
    Ok(())
}

#[tokio::test]
async fn strict_connectivity_aborts_the_run() -> eyre::Result<()> {
    let input = torsion_input(vec![
        common::torsion("broken", common::fragmented_ethane(), "CC"),
        common::torsion("fine", common::ethane(), "CC"),
    ]);
    let requests = torsiondrive_requests(index_torsions(&input, 15)?, None);

    let portal = MemoryPortal::new();
    let options = SubmissionOptions {
        strict_connectivity: true,
        ..torsion_options()
    };
    let submitter = Submitter::new(&portal, options);
    let mut dataset = Collection::new(DatasetKind::TorsionDrive, "scan");

    let result = submitter.submit(&mut dataset, requests).await;

    assert!(matches!(result, Err(SubmitError::Connectivity { ref name, .. }) if name == "broken"));
    assert_eq!(portal.molecule_calls(), 0);
    assert_eq!(portal.saves(), 0);
    Ok(())
}

#[tokio::test]
async fn dataset_is_saved_every_batch_and_at_the_end() -> eyre::Result<()> {
    let records: Vec<MoleculeRecord> = serde_json::from_value(json!([{
        "initial_molecules": (0..65).map(|i| common::ethanol_conformer(i as f64 * 0.01)).collect::<Vec<_>>(),
        "cmiles_identifiers": {"canonical_isomeric_smiles": "CCO"}
    }]))?;
    let index = index_molecules(&records, DEFAULT_ID_FIELD)?;

    let portal = MemoryPortal::new();
    let submitter = Submitter::new(&portal, SubmissionOptions::default());
    let mut dataset = submitter
        .prepare_dataset(
            DatasetKind::Optimization,
            "opt",
            false,
            optimization_specification(DEFAULT_SPEC_NAME, DEFAULT_QM_METHOD, DEFAULT_QM_BASIS),
        )
        .await?;
    let report = submitter
        .submit(&mut dataset, optimization_requests(&index))
        .await?;

    assert_eq!(report.added(), 65);
    // after 30, after 60, and the final save
    assert_eq!(report.saves, 3);
    assert_eq!(portal.saves(), 3);
    assert_eq!(dataset.unsaved(), 0);
    assert!(dataset.id.is_some());
    Ok(())
}

#[tokio::test]
async fn final_save_is_safe_on_a_batch_boundary() -> eyre::Result<()> {
    let records: Vec<MoleculeRecord> = serde_json::from_value(json!([{
        "initial_molecules": (0..4).map(|i| common::ethanol_conformer(i as f64)).collect::<Vec<_>>(),
        "cmiles_identifiers": {"canonical_isomeric_smiles": "CCO"}
    }]))?;
    let index = index_molecules(&records, DEFAULT_ID_FIELD)?;

    let portal = MemoryPortal::new();
    let options = SubmissionOptions {
        batch_size: 2,
        ..Default::default()
    };
    let submitter = Submitter::new(&portal, options);
    let mut dataset = Collection::new(DatasetKind::Optimization, "opt");
    let report = submitter
        .submit(&mut dataset, optimization_requests(&index))
        .await?;

    assert_eq!(report.saves, 3);
    let stored = portal.collection(DatasetKind::Optimization, "opt").unwrap();
    assert_eq!(stored.records.len(), 4);
    assert_eq!(stored.id, dataset.id);
    Ok(())
}

#[tokio::test]
async fn optimization_compute_uses_the_registered_method() -> eyre::Result<()> {
    let records: Vec<MoleculeRecord> = serde_json::from_value(json!([
        {"initial_molecules": [common::ethanol_conformer(0.0), common::ethanol_conformer(1.0)],
         "cmiles_identifiers": {"canonical_isomeric_smiles": "CCO"}}
    ]))?;
    let index = index_molecules(&records, DEFAULT_ID_FIELD)?;

    let portal = MemoryPortal::new();
    let submitter = Submitter::new(&portal, SubmissionOptions::default());
    let mut dataset = submitter
        .prepare_dataset(
            DatasetKind::Optimization,
            "opt",
            false,
            optimization_specification(DEFAULT_SPEC_NAME, "mp2", "def2-svp"),
        )
        .await?;
    submitter
        .submit(&mut dataset, optimization_requests(&index))
        .await?;
    let response = submitter.compute(&dataset, Some("openff")).await?;

    assert_eq!(response.submitted.len(), 2);
    let procedures = portal.procedures();
    assert_eq!(procedures.len(), 1);
    let (tag, procedure, molecules) = &procedures[0];
    assert_eq!(tag.as_deref(), Some("openff"));
    assert_eq!(procedure.program, "geometric");
    assert_eq!(procedure.qc_spec.method, "mp2");
    assert_eq!(procedure.qc_spec.basis.as_deref(), Some("def2-svp"));
    assert_eq!(molecules.len(), 2);
    Ok(())
}

#[tokio::test]
async fn torsiondrive_compute_submits_one_service_per_entry() -> eyre::Result<()> {
    let input = torsion_input(vec![
        common::torsion("rot_1", common::ethane(), "CC"),
        (
            "rot_2".to_string(),
            json!({
                "initial_molecules": [common::ethane()],
                "atom_indices": [[3, 0, 1, 6]],
                "attributes": {"canonical_isomeric_smiles": "CC"}
            }),
        ),
    ]);
    let requests = torsiondrive_requests(index_torsions(&input, 15)?, Some(0.05));

    let portal = MemoryPortal::new();
    let submitter = Submitter::new(&portal, torsion_options());
    let mut dataset = submitter
        .prepare_dataset(
            DatasetKind::TorsionDrive,
            "scan",
            false,
            torsiondrive_specification(DEFAULT_SPEC_NAME),
        )
        .await?;
    submitter.submit(&mut dataset, requests).await?;

    let first = submitter.compute(&dataset, Some("openff")).await?;
    assert_eq!(first.submitted.len(), 2);
    assert_eq!(portal.services().len(), 2);
    assert_eq!(portal.services()[0].0.as_deref(), Some("openff"));

    // identical requests are reported as existing
    let second = submitter.compute(&dataset, Some("openff")).await?;
    assert_eq!(second.existing.len(), 2);
    assert!(second.submitted.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_specification_cannot_be_computed() -> eyre::Result<()> {
    let portal = MemoryPortal::new();
    let options = SubmissionOptions {
        spec_name: "other".to_string(),
        ..Default::default()
    };
    let submitter = Submitter::new(&portal, options);
    let dataset = Collection::new(DatasetKind::Optimization, "opt");

    assert!(matches!(
        submitter.compute(&dataset, None).await,
        Err(PortalError::UnknownSpecification(_))
    ));
    Ok(())
}

#[tokio::test]
async fn updating_a_missing_dataset_fails() {
    let portal = MemoryPortal::new();
    let submitter = Submitter::new(&portal, torsion_options());

    let result = submitter
        .prepare_dataset(
            DatasetKind::TorsionDrive,
            "absent",
            true,
            torsiondrive_specification(DEFAULT_SPEC_NAME),
        )
        .await;

    assert!(matches!(result, Err(PortalError::NotFound { .. })));
}

#[tokio::test]
async fn creating_an_existing_dataset_fails_on_first_save() -> eyre::Result<()> {
    let portal = MemoryPortal::new()
        .with_collection(Collection::new(DatasetKind::Optimization, "opt"));
    assert!(portal.get_collection(DatasetKind::Optimization, "opt").await.is_ok());

    let submitter = Submitter::new(&portal, SubmissionOptions::default());
    let mut dataset = Collection::new(DatasetKind::Optimization, "opt");
    let result = submitter.submit(&mut dataset, Vec::new()).await;

    assert!(matches!(
        result,
        Err(SubmitError::Portal(PortalError::Remote { .. }))
    ));
    Ok(())
}

/// Passes everything through to a `MemoryPortal` but rejects the molecule
/// upload numbered `fail_at` (starting from 1).
struct FlakyPortal {
    inner: MemoryPortal,
    fail_at: usize,
    uploads: std::sync::atomic::AtomicUsize,
}

impl PortalClient for FlakyPortal {
    async fn get_collection(
        &self,
        kind: DatasetKind,
        name: &str,
    ) -> Result<Collection, PortalError> {
        self.inner.get_collection(kind, name).await
    }

    async fn add_collection(
        &self,
        collection: &Collection,
        overwrite: bool,
    ) -> Result<ObjectId, PortalError> {
        self.inner.add_collection(collection, overwrite).await
    }

    async fn add_keywords(&self, keywords: &[KeywordSet]) -> Result<Vec<ObjectId>, PortalError> {
        self.inner.add_keywords(keywords).await
    }

    async fn add_molecules(&self, molecules: &[Molecule]) -> Result<Vec<ObjectId>, PortalError> {
        let upload = self
            .uploads
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        if upload == self.fail_at {
            return Err(PortalError::Remote {
                endpoint: "molecule".to_string(),
                message: "server unavailable".to_string(),
            });
        }
        self.inner.add_molecules(molecules).await
    }

    async fn add_service(
        &self,
        services: &[TorsionDriveInput],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        self.inner.add_service(services, tag).await
    }

    async fn add_procedure(
        &self,
        procedure: &OptimizationProcedure,
        molecules: &[ObjectId],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        self.inner.add_procedure(procedure, molecules, tag).await
    }
}

#[tokio::test]
async fn remote_error_while_adding_ends_the_run() -> eyre::Result<()> {
    let input = torsion_input(vec![
        common::torsion("t1", common::ethane(), "CC"),
        common::torsion("t2", common::ethane(), "CC"),
        common::torsion("t3", common::ethane(), "CC"),
    ]);
    let requests = torsiondrive_requests(index_torsions(&input, 15)?, None);

    let portal = FlakyPortal {
        inner: MemoryPortal::new(),
        fail_at: 2,
        uploads: Default::default(),
    };
    let submitter = Submitter::new(&portal, torsion_options());
    let mut dataset = Collection::new(DatasetKind::TorsionDrive, "scan");

    let result = submitter.submit(&mut dataset, requests).await;

    assert!(matches!(
        result,
        Err(SubmitError::Portal(PortalError::Remote { ref endpoint, .. })) if endpoint == "molecule"
    ));
    // t3 is never uploaded
    assert_eq!(portal.uploads.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(portal.inner.saves(), 0);
    assert!(portal
        .inner
        .collection(DatasetKind::TorsionDrive, "scan")
        .is_none());
    assert!(dataset.contains_entry("t1"));
    assert!(!dataset.contains_entry("t3"));
    Ok(())
}
