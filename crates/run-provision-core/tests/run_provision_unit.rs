// crates/run-provision-core/tests/run_provision_unit.rs
// ============================================================================
// Module: Run Provisioning Unit Tests
// Description: Trigger-key branching, snapshot fallback, and atomicity.
// Purpose: Validate configure_run against the in-memory reference store.
// ============================================================================

//! Unit tests for the run-configuration entry point:
//! - Central runs persist exactly the flattened snapshot mapping.
//! - The reference snapshot applies only when the service has none.
//! - Retrieval failure writes nothing.
//! - Local runs persist minimal placeholder metadata only.
//! - Commit failure rolls every staged row back.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use run_provision_core::DatasetName;
use run_provision_core::GlobalSettings;
use run_provision_core::LOCAL_RUN_ERA;
use run_provision_core::LOCAL_RUN_PROCESS;
use run_provision_core::PipelineConfig;
use run_provision_core::ProvisionError;
use run_provision_core::RunNumber;
use run_provision_core::StoreError;
use run_provision_core::StreamName;
use run_provision_core::TriggerConfig;
use run_provision_core::TriggerConfigError;
use run_provision_core::TriggerConfigSource;
use run_provision_core::TriggerKey;
use run_provision_core::TriggerPath;
use run_provision_core::runtime::InMemoryProvisionStore;
use run_provision_core::runtime::Provisioner;
use run_provision_core::runtime::RunProvisionOutcome;

// ============================================================================
// SECTION: Test Fixtures
// ============================================================================

struct StaticTriggerSource {
    snapshot: Option<TriggerConfig>,
}

impl TriggerConfigSource for StaticTriggerSource {
    fn fetch(&self, _key: &TriggerKey) -> Result<Option<TriggerConfig>, TriggerConfigError> {
        Ok(self.snapshot.clone())
    }
}

struct FailingTriggerSource;

impl TriggerConfigSource for FailingTriggerSource {
    fn fetch(&self, _key: &TriggerKey) -> Result<Option<TriggerConfig>, TriggerConfigError> {
        Err(TriggerConfigError::Source("confdb unreachable".to_string()))
    }
}

fn run_number(raw: u32) -> RunNumber {
    RunNumber::from_raw(raw).expect("non-zero run number")
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        global: GlobalSettings {
            acquisition_era: "Commissioning2026".to_string(),
            reco_timeout_secs: 3_600,
            reco_lock_timeout_secs: 300,
        },
        ..PipelineConfig::default()
    }
}

fn sample_snapshot() -> TriggerConfig {
    let mut snapshot = TriggerConfig::new("HLT");
    snapshot.insert_dataset(
        StreamName::new("A"),
        DatasetName::new("MinimumBias"),
        vec![TriggerPath::new("HLT_MinBias"), TriggerPath::new("HLT_ZeroBias")],
    );
    snapshot.insert_dataset(
        StreamName::new("A"),
        DatasetName::new("Commissioning"),
        vec![TriggerPath::new("HLT_Random")],
    );
    snapshot.insert_dataset(
        StreamName::new("Express"),
        DatasetName::new("ExpressPhysics"),
        // HLT_ZeroBias also feeds stream A; the store deduplicates it.
        vec![TriggerPath::new("HLT_ZeroBias")],
    );
    snapshot
}

fn central_store(run: RunNumber) -> InMemoryProvisionStore {
    let mut store = InMemoryProvisionStore::new();
    store.register_run(run, Some(TriggerKey::new("/cdaq/physics/v1")));
    store
}

// ============================================================================
// SECTION: Central Runs
// ============================================================================

#[test]
fn central_run_persists_flattened_mapping() {
    let run = run_number(200_100);
    let store = central_store(run);
    let mut provisioner = Provisioner::new(
        store,
        StaticTriggerSource {
            snapshot: Some(sample_snapshot()),
        },
    );

    let outcome = provisioner
        .configure_run(&pipeline_config(), run, None)
        .expect("configure run");
    assert_eq!(outcome, RunProvisionOutcome::Central);

    let tables = provisioner.store().snapshot();
    let metadata = tables.runs.get(&run).expect("run metadata");
    assert_eq!(metadata.process.as_deref(), Some("HLT"));
    assert_eq!(metadata.acquisition_era.as_deref(), Some("Commissioning2026"));
    assert_eq!(metadata.reco_timeout_secs, Some(3_600));
    assert_eq!(metadata.reco_lock_timeout_secs, Some(300));

    let streams: BTreeSet<&str> =
        tables.streams.iter().map(StreamName::as_str).collect();
    assert_eq!(streams, BTreeSet::from(["A", "Express"]));

    let datasets: BTreeSet<&str> =
        tables.datasets.iter().map(DatasetName::as_str).collect();
    assert_eq!(datasets, BTreeSet::from(["Commissioning", "ExpressPhysics", "MinimumBias"]));

    let stream_datasets: BTreeSet<(&str, &str)> = tables
        .stream_datasets
        .iter()
        .map(|row| (row.stream.as_str(), row.dataset.as_str()))
        .collect();
    assert_eq!(
        stream_datasets,
        BTreeSet::from([
            ("A", "Commissioning"),
            ("A", "MinimumBias"),
            ("Express", "ExpressPhysics"),
        ])
    );

    let dataset_triggers: BTreeSet<(&str, &str)> = tables
        .dataset_triggers
        .iter()
        .map(|row| (row.dataset.as_str(), row.trigger.as_str()))
        .collect();
    assert_eq!(
        dataset_triggers,
        BTreeSet::from([
            ("Commissioning", "HLT_Random"),
            ("ExpressPhysics", "HLT_ZeroBias"),
            ("MinimumBias", "HLT_MinBias"),
            ("MinimumBias", "HLT_ZeroBias"),
        ])
    );

    // HLT_ZeroBias appears under two datasets but registers once.
    let triggers: BTreeSet<&str> =
        tables.triggers.iter().map(TriggerPath::as_str).collect();
    assert_eq!(triggers, BTreeSet::from(["HLT_MinBias", "HLT_Random", "HLT_ZeroBias"]));
}

#[test]
fn reference_snapshot_applies_when_service_has_none() {
    let run = run_number(200_101);
    let store = central_store(run);
    let mut provisioner = Provisioner::new(store, StaticTriggerSource { snapshot: None });

    let reference = sample_snapshot();
    let outcome = provisioner
        .configure_run(&pipeline_config(), run, Some(&reference))
        .expect("configure run with reference");
    assert_eq!(outcome, RunProvisionOutcome::Central);

    let tables = provisioner.store().snapshot();
    assert_eq!(tables.runs.get(&run).and_then(|m| m.process.as_deref()), Some("HLT"));
    assert!(!tables.stream_datasets.is_empty());
}

#[test]
fn missing_snapshot_without_reference_writes_nothing() {
    let run = run_number(200_102);
    let store = central_store(run);
    let mut provisioner = Provisioner::new(store, StaticTriggerSource { snapshot: None });

    let err = provisioner
        .configure_run(&pipeline_config(), run, None)
        .expect_err("retrieval must fail");
    assert_eq!(err, ProvisionError::TriggerConfigUnavailable { run });

    let tables = provisioner.store().snapshot();
    assert_eq!(tables.runs.get(&run).and_then(|m| m.process.clone()), None);
    assert!(tables.streams.is_empty());
    assert!(tables.stream_datasets.is_empty());
    assert!(tables.dataset_triggers.is_empty());
}

#[test]
fn source_error_propagates_before_any_write() {
    let run = run_number(200_103);
    let store = central_store(run);
    let mut provisioner = Provisioner::new(store, FailingTriggerSource);

    let err = provisioner
        .configure_run(&pipeline_config(), run, None)
        .expect_err("source failure must propagate");
    assert!(matches!(err, ProvisionError::TriggerConfig(_)));

    let tables = provisioner.store().snapshot();
    assert!(tables.streams.is_empty());
    assert!(tables.stream_datasets.is_empty());
}

#[test]
fn commit_failure_rolls_back_every_staged_row() {
    let run = run_number(200_104);
    let mut store = central_store(run);
    store.fail_next_commit();
    let mut provisioner = Provisioner::new(
        store,
        StaticTriggerSource {
            snapshot: Some(sample_snapshot()),
        },
    );

    let err = provisioner
        .configure_run(&pipeline_config(), run, None)
        .expect_err("injected commit failure");
    assert!(matches!(err, ProvisionError::Store(StoreError::Db(_))));

    let tables = provisioner.store().snapshot();
    assert_eq!(tables.runs.get(&run).and_then(|m| m.process.clone()), None);
    assert!(tables.streams.is_empty());
    assert!(tables.datasets.is_empty());
    assert!(tables.stream_datasets.is_empty());
    assert!(tables.triggers.is_empty());
    assert!(tables.dataset_triggers.is_empty());
}

// ============================================================================
// SECTION: Local Runs
// ============================================================================

#[test]
fn local_run_persists_minimal_placeholder_metadata() {
    let run = run_number(200_105);
    let mut store = InMemoryProvisionStore::new();
    store.register_run(run, None);
    let mut provisioner = Provisioner::new(store, StaticTriggerSource { snapshot: None });

    let outcome = provisioner
        .configure_run(&pipeline_config(), run, None)
        .expect("configure local run");
    assert_eq!(outcome, RunProvisionOutcome::Local);

    let tables = provisioner.store().snapshot();
    let metadata = tables.runs.get(&run).expect("run metadata");
    assert_eq!(metadata.process.as_deref(), Some(LOCAL_RUN_PROCESS));
    assert_eq!(metadata.acquisition_era.as_deref(), Some(LOCAL_RUN_ERA));
    assert_eq!(metadata.reco_timeout_secs, None);
    assert!(tables.streams.is_empty());
    assert!(tables.stream_datasets.is_empty());
    assert!(tables.dataset_triggers.is_empty());
}

#[test]
fn unregistered_run_fails_closed() {
    let run = run_number(200_106);
    let store = InMemoryProvisionStore::new();
    let mut provisioner = Provisioner::new(store, StaticTriggerSource { snapshot: None });

    // No run row, no trigger key: the local-run path must reject the update
    // instead of fabricating a run.
    let err = provisioner
        .configure_run(&pipeline_config(), run, None)
        .expect_err("unknown run must fail");
    assert!(matches!(err, ProvisionError::Store(StoreError::Invalid(_))));
}
