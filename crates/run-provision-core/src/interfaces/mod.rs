// crates/run-provision-core/src/interfaces/mod.rs
// ============================================================================
// Module: Run Provision Interfaces
// Description: Backend-agnostic interfaces for trigger lookup and persistence.
// Purpose: Define the contract surfaces used by the provisioning runtime.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how run provisioning integrates with the trigger
//! configuration service and the backing relational store without embedding
//! backend-specific details. Implementations must be deterministic and fail
//! closed on missing or invalid data.
//!
//! The persistence contract is split in two: [`ProvisionStore`] carries the
//! standalone lookups plus [`ProvisionStore::begin`], and [`ProvisionTx`] is
//! the unit of work — one strongly-typed method per named operation, closed
//! by an explicit `commit` or `rollback`. Every row written by one
//! provisioning call goes through exactly one transaction; partial
//! configuration state must never be observable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::CmsswVersion;
use crate::core::identifiers::DatasetName;
use crate::core::identifiers::NodeName;
use crate::core::identifiers::RunNumber;
use crate::core::identifiers::StreamName;
use crate::core::identifiers::TriggerKey;
use crate::core::identifiers::TriggerPath;
use crate::core::rows::DatasetScenarioRow;
use crate::core::rows::DatasetTriggerRow;
use crate::core::rows::ErrorDatasetRow;
use crate::core::rows::ExpressConfigRow;
use crate::core::rows::RecoConfigRow;
use crate::core::rows::RepackConfigRow;
use crate::core::rows::RunUpdate;
use crate::core::rows::SkimConfigRow;
use crate::core::rows::SpecialDatasetRow;
use crate::core::rows::StorageAssignmentRow;
use crate::core::rows::StreamDatasetRow;
use crate::core::rows::StreamOverrideRow;
use crate::core::rows::StreamStyleRow;
use crate::core::trigger::TriggerConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Persistence-layer errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Error messages avoid embedding full row payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Database engine error.
    #[error("store db error: {0}")]
    Db(String),
    /// Invalid store data or invalid operation for the current state.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

/// Trigger-configuration retrieval errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerConfigError {
    /// The trigger configuration service reported an error.
    #[error("trigger config source error: {0}")]
    Source(String),
}

// ============================================================================
// SECTION: Trigger Configuration Source
// ============================================================================

/// Backend-agnostic trigger configuration retrieval.
pub trait TriggerConfigSource {
    /// Fetches the trigger configuration snapshot for a key.
    ///
    /// Returns `Ok(None)` when the service holds no snapshot for the key;
    /// the caller-supplied reference snapshot applies in that case.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerConfigError`] when the service cannot be reached or
    /// returns an unusable payload.
    fn fetch(&self, key: &TriggerKey) -> Result<Option<TriggerConfig>, TriggerConfigError>;
}

// ============================================================================
// SECTION: Provision Store
// ============================================================================

/// Backend-agnostic provisioning store.
///
/// Lookups execute standalone, outside any transaction; mutations go
/// through the transaction handle returned by [`ProvisionStore::begin`],
/// except [`ProvisionStore::update_run_minimal`] which is a single atomic
/// statement by construction.
pub trait ProvisionStore {
    /// Transaction handle type produced by [`ProvisionStore::begin`].
    type Tx<'conn>: ProvisionTx
    where
        Self: 'conn;

    /// Opens the unit of work for one provisioning call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the transaction cannot be opened.
    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError>;

    /// Returns the trigger key recorded for a run, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn trigger_key(&self, run: RunNumber) -> Result<Option<TriggerKey>, StoreError>;

    /// Returns the primary datasets currently bound to a (run, stream) pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn stream_datasets(
        &self,
        run: RunNumber,
        stream: &StreamName,
    ) -> Result<Vec<DatasetName>, StoreError>;

    /// Returns the software version observed for a stream at acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn online_version(
        &self,
        run: RunNumber,
        stream: &StreamName,
    ) -> Result<Option<CmsswVersion>, StoreError>;

    /// Writes minimal run metadata for a local run as one atomic statement.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the run is unknown or the write fails.
    fn update_run_minimal(
        &mut self,
        run: RunNumber,
        process: &str,
        acquisition_era: &str,
    ) -> Result<(), StoreError>;
}

/// Unit of work over the provisioning store.
///
/// # Invariants
/// - Insert operations deduplicate on their unique key; re-submitting
///   identical rows is a no-op, never a duplicate.
/// - Nothing becomes visible before [`ProvisionTx::commit`]; dropping the
///   handle or calling [`ProvisionTx::rollback`] discards every staged write.
pub trait ProvisionTx {
    /// Updates global run metadata for a centrally-triggered run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the run is unknown or the write fails.
    fn update_run(&mut self, row: &RunUpdate) -> Result<(), StoreError>;

    /// Registers stream names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_streams(&mut self, rows: &[StreamName]) -> Result<(), StoreError>;

    /// Registers primary dataset names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_datasets(&mut self, rows: &[DatasetName]) -> Result<(), StoreError>;

    /// Associates datasets to streams for one run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_stream_datasets(&mut self, rows: &[StreamDatasetRow]) -> Result<(), StoreError>;

    /// Registers trigger path names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_triggers(&mut self, rows: &[TriggerPath]) -> Result<(), StoreError>;

    /// Associates trigger paths to datasets for one run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_dataset_triggers(&mut self, rows: &[DatasetTriggerRow]) -> Result<(), StoreError>;

    /// Writes the processing-style row for one (run, stream) pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_stream_style(&mut self, row: &StreamStyleRow) -> Result<(), StoreError>;

    /// Writes the repack configuration for a bulk-style stream.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_repack_config(&mut self, row: &RepackConfigRow) -> Result<(), StoreError>;

    /// Writes the express configuration for an express-style stream.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_express_config(&mut self, row: &ExpressConfigRow) -> Result<(), StoreError>;

    /// Marks a stream's placeholder dataset as special.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_special_dataset(&mut self, row: &SpecialDatasetRow) -> Result<(), StoreError>;

    /// Associates processing scenarios to datasets for one run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_dataset_scenarios(&mut self, rows: &[DatasetScenarioRow]) -> Result<(), StoreError>;

    /// Registers software version labels.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_software_versions(&mut self, rows: &[CmsswVersion]) -> Result<(), StoreError>;

    /// Upserts the software-version override for one (run, stream) pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_stream_override(&mut self, row: &StreamOverrideRow) -> Result<(), StoreError>;

    /// Records error-catch datasets for their parent datasets.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_error_datasets(&mut self, rows: &[ErrorDatasetRow]) -> Result<(), StoreError>;

    /// Writes reconstruction-policy rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_reco_configs(&mut self, rows: &[RecoConfigRow]) -> Result<(), StoreError>;

    /// Registers storage node names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_storage_nodes(&mut self, rows: &[NodeName]) -> Result<(), StoreError>;

    /// Writes storage-destination assignments.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_storage_assignments(
        &mut self,
        rows: &[StorageAssignmentRow],
    ) -> Result<(), StoreError>;

    /// Writes Tier-1 skim job specifications.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_skim_configs(&mut self, rows: &[SkimConfigRow]) -> Result<(), StoreError>;

    /// Commits every staged write atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the commit fails; no staged write is
    /// retained in that case.
    fn commit(self) -> Result<(), StoreError>;

    /// Discards every staged write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the rollback itself fails; staged writes
    /// are still discarded.
    fn rollback(self) -> Result<(), StoreError>;
}
