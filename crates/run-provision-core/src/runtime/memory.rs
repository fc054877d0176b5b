// crates/run-provision-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Provision Store
// Description: Reference ProvisionStore used by tests and bootstrap tooling.
// Purpose: Mirror the relational unique-key semantics without a database.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryProvisionStore`] implements the full [`ProvisionStore`]
//! contract over `BTreeMap`/`BTreeSet` tables keyed exactly like the SQLite
//! schema. Its transaction stages writes against a copy of the tables and
//! swaps the copy in on commit, so atomicity and rollback are observable in
//! contract tests. Insert operations deduplicate on their unique key, which
//! makes re-submission of identical binds a no-op — the same idempotence the
//! durable store provides.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::identifiers::CmsswVersion;
use crate::core::identifiers::DatasetName;
use crate::core::identifiers::NodeName;
use crate::core::identifiers::RunNumber;
use crate::core::identifiers::Scenario;
use crate::core::identifiers::StreamName;
use crate::core::identifiers::TriggerKey;
use crate::core::identifiers::TriggerPath;
use crate::core::rows::DatasetScenarioRow;
use crate::core::rows::DatasetTriggerRow;
use crate::core::rows::ErrorDatasetRow;
use crate::core::rows::ExpressConfigRow;
use crate::core::rows::ProcessingStyle;
use crate::core::rows::RecoConfigRow;
use crate::core::rows::RepackConfigRow;
use crate::core::rows::RunUpdate;
use crate::core::rows::SkimConfigRow;
use crate::core::rows::SpecialDatasetRow;
use crate::core::rows::StorageAssignmentRow;
use crate::core::rows::StreamDatasetRow;
use crate::core::rows::StreamOverrideRow;
use crate::core::rows::StreamStyleRow;
use crate::interfaces::ProvisionStore;
use crate::interfaces::ProvisionTx;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Run Metadata
// ============================================================================

/// Run metadata row held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunMetadata {
    /// Trigger key recorded when the run was first observed, if any.
    pub trigger_key: Option<TriggerKey>,
    /// Process name; unset until the run is configured.
    pub process: Option<String>,
    /// Acquisition era; unset until the run is configured.
    pub acquisition_era: Option<String>,
    /// Reconstruction release timeout in seconds; central runs only.
    pub reco_timeout_secs: Option<u32>,
    /// Reconstruction lock timeout in seconds; central runs only.
    pub reco_lock_timeout_secs: Option<u32>,
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Relational tables mirrored by the in-memory store.
///
/// # Invariants
/// - Keys match the unique keys of the SQLite schema one to one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProvisionTables {
    /// Run metadata keyed by run number.
    pub runs: BTreeMap<RunNumber, RunMetadata>,
    /// Registered stream names.
    pub streams: BTreeSet<StreamName>,
    /// Registered primary dataset names.
    pub datasets: BTreeSet<DatasetName>,
    /// Registered trigger path names.
    pub triggers: BTreeSet<TriggerPath>,
    /// Registered software version labels.
    pub software_versions: BTreeSet<CmsswVersion>,
    /// Registered storage node names.
    pub storage_nodes: BTreeSet<NodeName>,
    /// Dataset-to-stream associations.
    pub stream_datasets: BTreeSet<StreamDatasetRow>,
    /// Dataset-to-trigger associations.
    pub dataset_triggers: BTreeSet<DatasetTriggerRow>,
    /// Processing styles keyed by (run, stream).
    pub stream_styles: BTreeMap<(RunNumber, StreamName), ProcessingStyle>,
    /// Repack configurations keyed by (run, stream).
    pub repack_configs: BTreeMap<(RunNumber, StreamName), RepackConfigRow>,
    /// Express configurations keyed by (run, stream).
    pub express_configs: BTreeMap<(RunNumber, StreamName), ExpressConfigRow>,
    /// Placeholder-dataset markers.
    pub special_datasets: BTreeSet<SpecialDatasetRow>,
    /// Scenario associations keyed by (run, dataset).
    pub dataset_scenarios: BTreeMap<(RunNumber, DatasetName), Scenario>,
    /// Software-version overrides keyed by (run, stream).
    pub stream_overrides: BTreeMap<(RunNumber, StreamName), CmsswVersion>,
    /// Error-catch dataset registrations.
    pub error_datasets: BTreeSet<ErrorDatasetRow>,
    /// Reconstruction policies keyed by (run, dataset).
    pub reco_configs: BTreeMap<(RunNumber, DatasetName), RecoConfigRow>,
    /// Storage assignments keyed by (run, dataset, node).
    pub storage_assignments: BTreeMap<(RunNumber, DatasetName, NodeName), StorageAssignmentRow>,
    /// Skim specifications keyed by (run, dataset, tier, skim).
    pub skim_configs: BTreeMap<(RunNumber, DatasetName, String, String), SkimConfigRow>,
    /// Observed online software versions keyed by (run, stream); seeded.
    pub online_versions: BTreeMap<(RunNumber, StreamName), CmsswVersion>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-memory [`ProvisionStore`] with copy-on-commit transactions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvisionStore {
    /// Committed table state.
    tables: ProvisionTables,
    /// When set, the next transaction's commit fails and discards its writes.
    fail_next_commit: bool,
}

impl InMemoryProvisionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly-observed run and its trigger key, if any.
    ///
    /// Re-registering an existing run is a no-op.
    pub fn register_run(&mut self, run: RunNumber, trigger_key: Option<TriggerKey>) {
        self.tables.runs.entry(run).or_insert(RunMetadata {
            trigger_key,
            process: None,
            acquisition_era: None,
            reco_timeout_secs: None,
            reco_lock_timeout_secs: None,
        });
    }

    /// Records the software version observed for a stream at acquisition.
    pub fn set_online_version(
        &mut self,
        run: RunNumber,
        stream: StreamName,
        version: CmsswVersion,
    ) {
        self.tables.online_versions.insert((run, stream), version);
    }

    /// Makes the next transaction's commit fail, discarding its writes.
    pub fn fail_next_commit(&mut self) {
        self.fail_next_commit = true;
    }

    /// Returns the committed table state.
    #[must_use]
    pub const fn snapshot(&self) -> &ProvisionTables {
        &self.tables
    }
}

impl ProvisionStore for InMemoryProvisionStore {
    type Tx<'conn>
        = InMemoryTx<'conn>
    where
        Self: 'conn;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        let staged = self.tables.clone();
        let fail_commit = std::mem::take(&mut self.fail_next_commit);
        Ok(InMemoryTx {
            tables: &mut self.tables,
            staged,
            fail_commit,
        })
    }

    fn trigger_key(&self, run: RunNumber) -> Result<Option<TriggerKey>, StoreError> {
        Ok(self.tables.runs.get(&run).and_then(|metadata| metadata.trigger_key.clone()))
    }

    fn stream_datasets(
        &self,
        run: RunNumber,
        stream: &StreamName,
    ) -> Result<Vec<DatasetName>, StoreError> {
        Ok(self
            .tables
            .stream_datasets
            .iter()
            .filter(|row| row.run == run && &row.stream == stream)
            .map(|row| row.dataset.clone())
            .collect())
    }

    fn online_version(
        &self,
        run: RunNumber,
        stream: &StreamName,
    ) -> Result<Option<CmsswVersion>, StoreError> {
        Ok(self.tables.online_versions.get(&(run, stream.clone())).cloned())
    }

    fn update_run_minimal(
        &mut self,
        run: RunNumber,
        process: &str,
        acquisition_era: &str,
    ) -> Result<(), StoreError> {
        let metadata = self
            .tables
            .runs
            .get_mut(&run)
            .ok_or_else(|| StoreError::Invalid(format!("unknown run {run}")))?;
        metadata.process = Some(process.to_string());
        metadata.acquisition_era = Some(acquisition_era.to_string());
        Ok(())
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Copy-on-commit transaction over [`InMemoryProvisionStore`].
///
/// # Invariants
/// - Writes mutate the staged copy only; commit swaps the copy in whole.
#[derive(Debug)]
pub struct InMemoryTx<'conn> {
    /// Committed tables, replaced on commit.
    tables: &'conn mut ProvisionTables,
    /// Staged copy receiving every write.
    staged: ProvisionTables,
    /// Injected commit failure for atomicity contract tests.
    fail_commit: bool,
}

impl ProvisionTx for InMemoryTx<'_> {
    fn update_run(&mut self, row: &RunUpdate) -> Result<(), StoreError> {
        let metadata = self
            .staged
            .runs
            .get_mut(&row.run)
            .ok_or_else(|| StoreError::Invalid(format!("unknown run {}", row.run)))?;
        metadata.process = Some(row.process.clone());
        metadata.acquisition_era = Some(row.acquisition_era.clone());
        metadata.reco_timeout_secs = Some(row.reco_timeout_secs);
        metadata.reco_lock_timeout_secs = Some(row.reco_lock_timeout_secs);
        Ok(())
    }

    fn insert_streams(&mut self, rows: &[StreamName]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.streams.insert(row.clone());
        }
        Ok(())
    }

    fn insert_datasets(&mut self, rows: &[DatasetName]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.datasets.insert(row.clone());
        }
        Ok(())
    }

    fn insert_stream_datasets(&mut self, rows: &[StreamDatasetRow]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.stream_datasets.insert(row.clone());
        }
        Ok(())
    }

    fn insert_triggers(&mut self, rows: &[TriggerPath]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.triggers.insert(row.clone());
        }
        Ok(())
    }

    fn insert_dataset_triggers(&mut self, rows: &[DatasetTriggerRow]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.dataset_triggers.insert(row.clone());
        }
        Ok(())
    }

    fn insert_stream_style(&mut self, row: &StreamStyleRow) -> Result<(), StoreError> {
        self.staged
            .stream_styles
            .entry((row.run, row.stream.clone()))
            .or_insert(row.style);
        Ok(())
    }

    fn insert_repack_config(&mut self, row: &RepackConfigRow) -> Result<(), StoreError> {
        self.staged
            .repack_configs
            .entry((row.run, row.stream.clone()))
            .or_insert_with(|| row.clone());
        Ok(())
    }

    fn insert_express_config(&mut self, row: &ExpressConfigRow) -> Result<(), StoreError> {
        self.staged
            .express_configs
            .entry((row.run, row.stream.clone()))
            .or_insert_with(|| row.clone());
        Ok(())
    }

    fn insert_special_dataset(&mut self, row: &SpecialDatasetRow) -> Result<(), StoreError> {
        self.staged.special_datasets.insert(row.clone());
        Ok(())
    }

    fn insert_dataset_scenarios(&mut self, rows: &[DatasetScenarioRow]) -> Result<(), StoreError> {
        for row in rows {
            self.staged
                .dataset_scenarios
                .entry((row.run, row.dataset.clone()))
                .or_insert_with(|| row.scenario.clone());
        }
        Ok(())
    }

    fn insert_software_versions(&mut self, rows: &[CmsswVersion]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.software_versions.insert(row.clone());
        }
        Ok(())
    }

    fn update_stream_override(&mut self, row: &StreamOverrideRow) -> Result<(), StoreError> {
        self.staged
            .stream_overrides
            .insert((row.run, row.stream.clone()), row.override_version.clone());
        Ok(())
    }

    fn insert_error_datasets(&mut self, rows: &[ErrorDatasetRow]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.error_datasets.insert(row.clone());
        }
        Ok(())
    }

    fn insert_reco_configs(&mut self, rows: &[RecoConfigRow]) -> Result<(), StoreError> {
        for row in rows {
            self.staged
                .reco_configs
                .entry((row.run, row.dataset.clone()))
                .or_insert_with(|| row.clone());
        }
        Ok(())
    }

    fn insert_storage_nodes(&mut self, rows: &[NodeName]) -> Result<(), StoreError> {
        for row in rows {
            self.staged.storage_nodes.insert(row.clone());
        }
        Ok(())
    }

    fn insert_storage_assignments(
        &mut self,
        rows: &[StorageAssignmentRow],
    ) -> Result<(), StoreError> {
        for row in rows {
            self.staged
                .storage_assignments
                .entry((row.run, row.dataset.clone(), row.node.clone()))
                .or_insert_with(|| row.clone());
        }
        Ok(())
    }

    fn insert_skim_configs(&mut self, rows: &[SkimConfigRow]) -> Result<(), StoreError> {
        for row in rows {
            self.staged
                .skim_configs
                .entry((
                    row.run,
                    row.dataset.clone(),
                    row.data_tier.clone(),
                    row.skim_name.clone(),
                ))
                .or_insert_with(|| row.clone());
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Db("injected commit failure".to_string()));
        }
        *self.tables = self.staged;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
