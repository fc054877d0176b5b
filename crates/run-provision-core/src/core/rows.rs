// crates/run-provision-core/src/core/rows.rs
// ============================================================================
// Module: Run Provision Row Records
// Description: Typed bind records for every named persistence operation.
// Purpose: Carry staged configuration rows from plan builders to the store.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! Each record in this module corresponds 1:1 to one named persistence
//! operation on [`ProvisionTx`](crate::interfaces::ProvisionTx). Records are
//! plain data: plan builders produce them, stores bind them. Uniqueness is
//! not enforced here; the persistence layer deduplicates on each operation's
//! unique key, so repeated records are harmless.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CmsswVersion;
use crate::core::identifiers::DatasetName;
use crate::core::identifiers::NodeName;
use crate::core::identifiers::RunNumber;
use crate::core::identifiers::Scenario;
use crate::core::identifiers::StreamName;
use crate::core::identifiers::TriggerPath;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder process name written for local runs (no trigger key).
pub const LOCAL_RUN_PROCESS: &str = "FakeProcessName";

/// Placeholder acquisition era written for local runs (no trigger key).
pub const LOCAL_RUN_ERA: &str = "FakeAcquisitionEra";

/// Delimiter joining data-tier and skim-name lists into their wire form.
pub const LIST_DELIMITER: &str = ",";

// ============================================================================
// SECTION: Wire Enums
// ============================================================================

/// Per-stream data-handling policy.
///
/// # Invariants
/// - Labels are stable wire forms persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStyle {
    /// Full repack-and-reconstruct handling; the default for unconfigured streams.
    #[default]
    Bulk,
    /// Fast low-latency sample processing.
    Express,
}

impl ProcessingStyle {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bulk => "Bulk",
            Self::Express => "Express",
        }
    }
}

/// Transfer priority for a storage-destination assignment.
///
/// # Invariants
/// - Labels are stable wire forms persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferPriority {
    /// Highest transfer priority; used for all archival copies.
    High,
    /// Default transfer priority.
    #[default]
    Normal,
    /// Lowest transfer priority.
    Low,
}

impl TransferPriority {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

// ============================================================================
// SECTION: Naming Helpers
// ============================================================================

/// Returns the placeholder dataset name registered for an express stream.
#[must_use]
pub fn express_placeholder_dataset(stream: &StreamName) -> DatasetName {
    DatasetName::new(format!("Stream{stream}"))
}

/// Returns the error-catch dataset name synthesized for a parent dataset.
#[must_use]
pub fn error_dataset_name(parent: &DatasetName) -> DatasetName {
    DatasetName::new(format!("{parent}-Error"))
}

/// Joins a list of labels into the delimited wire form, or `None` when empty.
#[must_use]
pub fn join_labels(labels: &[String]) -> Option<String> {
    if labels.is_empty() {
        None
    } else {
        Some(labels.join(LIST_DELIMITER))
    }
}

// ============================================================================
// SECTION: Run Rows
// ============================================================================

/// Global run metadata written once a trigger configuration is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunUpdate {
    /// Run number.
    pub run: RunNumber,
    /// Process name taken from the trigger configuration snapshot.
    pub process: String,
    /// Acquisition era taken from the global configuration.
    pub acquisition_era: String,
    /// Reconstruction release timeout in seconds.
    pub reco_timeout_secs: u32,
    /// Reconstruction lock timeout in seconds.
    pub reco_lock_timeout_secs: u32,
}

// ============================================================================
// SECTION: Association Rows
// ============================================================================

/// Dataset-to-stream association scoped to one run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamDatasetRow {
    /// Run number.
    pub run: RunNumber,
    /// Primary dataset name.
    pub dataset: DatasetName,
    /// Stream name.
    pub stream: StreamName,
}

/// Dataset-to-trigger-path association scoped to one run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetTriggerRow {
    /// Run number.
    pub run: RunNumber,
    /// Trigger path name.
    pub trigger: TriggerPath,
    /// Primary dataset name.
    pub dataset: DatasetName,
}

/// Placeholder-dataset marker for an express stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecialDatasetRow {
    /// Stream name.
    pub stream: StreamName,
    /// Placeholder dataset name (`Stream<stream>`).
    pub dataset: DatasetName,
}

/// Error-catch dataset registration for a parent dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorDatasetRow {
    /// Parent primary dataset name.
    pub parent: DatasetName,
    /// Synthesized error dataset name (`<parent>-Error`).
    pub error: DatasetName,
}

/// Scenario association for a dataset scoped to one run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetScenarioRow {
    /// Run number.
    pub run: RunNumber,
    /// Primary dataset name.
    pub dataset: DatasetName,
    /// Processing scenario name.
    pub scenario: Scenario,
}

// ============================================================================
// SECTION: Stream Configuration Rows
// ============================================================================

/// Processing-style assignment for one (run, stream) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStyleRow {
    /// Run number.
    pub run: RunNumber,
    /// Stream name.
    pub stream: StreamName,
    /// Processing style.
    pub style: ProcessingStyle,
}

/// Repack configuration for a bulk-style (run, stream) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepackConfigRow {
    /// Run number.
    pub run: RunNumber,
    /// Stream name.
    pub stream: StreamName,
    /// Repack processing version.
    pub processing_version: String,
}

/// Express configuration for an express-style (run, stream) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressConfigRow {
    /// Run number.
    pub run: RunNumber,
    /// Stream name.
    pub stream: StreamName,
    /// Express processing version.
    pub processing_version: String,
    /// Output data tiers, joined with [`LIST_DELIMITER`].
    pub write_tiers: String,
    /// Output skim names joined with [`LIST_DELIMITER`], or absent when none.
    pub write_skims: Option<String>,
    /// Conditions global tag.
    pub global_tag: String,
    /// Express processing configuration URL.
    pub processing_config_url: String,
    /// AlCa merge configuration URL.
    pub alca_merge_config_url: String,
}

/// Software-version override staged for one (run, stream) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOverrideRow {
    /// Run number.
    pub run: RunNumber,
    /// Stream name.
    pub stream: StreamName,
    /// Override software version applied in place of the observed one.
    pub override_version: CmsswVersion,
}

// ============================================================================
// SECTION: Dataset Policy Rows
// ============================================================================

/// Reconstruction policy for one (run, dataset) pair.
///
/// # Invariants
/// - An error dataset's row mirrors its parent's technical fields with
///   `do_reco` forced to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoConfigRow {
    /// Run number.
    pub run: RunNumber,
    /// Primary dataset name.
    pub dataset: DatasetName,
    /// Whether reconstruction runs for this dataset.
    pub do_reco: bool,
    /// Reconstruction software version.
    pub cmssw_version: CmsswVersion,
    /// Event-splitting factor for reconstruction jobs.
    pub event_split: u32,
    /// Whether the RECO output tier is written.
    pub write_reco: bool,
    /// Whether the AOD output tier is written.
    pub write_aod: bool,
    /// Whether the DQM output tier is written.
    pub write_dqm: bool,
    /// Reconstruction processing version.
    pub processing_version: String,
    /// AlCa skim names joined with [`LIST_DELIMITER`], or absent when none.
    pub write_skims: Option<String>,
    /// Conditions global tag.
    pub global_tag: String,
    /// Reconstruction configuration URL.
    pub config_url: String,
}

/// Storage-destination assignment for one (run, dataset, node) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAssignmentRow {
    /// Run number.
    pub run: RunNumber,
    /// Primary dataset name.
    pub dataset: DatasetName,
    /// Storage node name.
    pub node: NodeName,
    /// Whether this node holds the primary durable copy.
    pub custodial: bool,
    /// Whether the transfer stays pending until approved by an operator.
    pub request_only: bool,
    /// Transfer priority.
    pub priority: TransferPriority,
}

/// Tier-1 skim job specification for one (run, dataset, tier, skim) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkimConfigRow {
    /// Run number.
    pub run: RunNumber,
    /// Primary dataset name.
    pub dataset: DatasetName,
    /// Input data tier the skim reads.
    pub data_tier: String,
    /// Skim name.
    pub skim_name: String,
    /// Execution node; resolved from the skim or the dataset's custodial node.
    pub node: NodeName,
    /// Skim software version.
    pub cmssw_version: CmsswVersion,
    /// Whether the skim reads parent files alongside reconstructed input.
    pub two_file_read: bool,
    /// Skim processing version.
    pub processing_version: String,
    /// Conditions global tag.
    pub global_tag: String,
    /// Skim configuration URL.
    pub config_url: String,
}
