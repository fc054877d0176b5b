// crates/run-provision-core/src/core/settings.rs
// ============================================================================
// Module: Declarative Pipeline Settings
// Description: Data model for the declarative per-run processing configuration.
// Purpose: Resolve global, per-stream, and per-dataset processing policies.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! This module models the declarative configuration object consumed by the
//! provisioning entry points: global settings, per-stream processing styles
//! with their repack/express parameter records, and per-dataset
//! reconstruction, skim, and storage policies. The model is format-agnostic
//! plain data; loading and validation live in `run-provision-config`.
//!
//! Resolution policy: streams absent from the model synthesize a bulk/repack
//! default (unconfigured streams are repacked, never reconstructed), and
//! datasets absent from the model clone the `dataset_defaults` template.
//! Both resolutions return owned values; the shared model is never mutated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CmsswVersion;
use crate::core::identifiers::DatasetName;
use crate::core::identifiers::NodeName;
use crate::core::identifiers::Scenario;
use crate::core::identifiers::StreamName;
use crate::core::rows::ProcessingStyle;
use crate::core::rows::TransferPriority;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default reconstruction release timeout in seconds.
const fn default_reco_timeout_secs() -> u32 {
    3_600
}

/// Returns the default reconstruction lock timeout in seconds.
const fn default_reco_lock_timeout_secs() -> u32 {
    300
}

/// Returns the default processing version for repack and reconstruction.
fn default_processing_version() -> String {
    "v1".to_string()
}

/// Returns the default reconstruction event-splitting factor.
const fn default_event_split() -> u32 {
    2_000
}

/// Returns the default for the RECO/AOD/DQM output-tier flags.
const fn default_write_tier() -> bool {
    true
}

// ============================================================================
// SECTION: Pipeline Configuration
// ============================================================================

/// Declarative configuration for the whole processing pipeline.
///
/// # Invariants
/// - Read-only during provisioning; resolution helpers return owned values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Global run settings.
    #[serde(default)]
    pub global: GlobalSettings,
    /// Explicitly configured streams, keyed by stream name.
    #[serde(default)]
    pub streams: BTreeMap<StreamName, StreamSettings>,
    /// Explicitly configured datasets, keyed by dataset name.
    #[serde(default)]
    pub datasets: BTreeMap<DatasetName, DatasetSettings>,
    /// Template cloned for datasets absent from `datasets`.
    #[serde(default)]
    pub dataset_defaults: DatasetSettings,
}

impl PipelineConfig {
    /// Resolves a stream's settings, synthesizing a bulk/repack default for
    /// streams absent from the configuration.
    #[must_use]
    pub fn stream_or_default(&self, stream: &StreamName) -> StreamSettings {
        self.streams.get(stream).cloned().unwrap_or_default()
    }

    /// Resolves a dataset's settings, cloning the `dataset_defaults`
    /// template for datasets absent from the configuration.
    #[must_use]
    pub fn dataset_or_default(&self, dataset: &DatasetName) -> DatasetSettings {
        self.datasets.get(dataset).cloned().unwrap_or_else(|| self.dataset_defaults.clone())
    }
}

/// Global run settings shared by every stream and dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Acquisition era label written into run metadata.
    pub acquisition_era: String,
    /// Reconstruction release timeout in seconds.
    #[serde(default = "default_reco_timeout_secs")]
    pub reco_timeout_secs: u32,
    /// Reconstruction lock timeout in seconds.
    #[serde(default = "default_reco_lock_timeout_secs")]
    pub reco_lock_timeout_secs: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            acquisition_era: String::new(),
            reco_timeout_secs: default_reco_timeout_secs(),
            reco_lock_timeout_secs: default_reco_lock_timeout_secs(),
        }
    }
}

// ============================================================================
// SECTION: Stream Settings
// ============================================================================

/// Per-stream processing settings.
///
/// # Invariants
/// - `express` must be present when `processing_style` is
///   [`ProcessingStyle::Express`]; validation enforces this before
///   provisioning, and the runtime fails closed if it is bypassed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StreamSettings {
    /// Processing style for the stream.
    #[serde(default)]
    pub processing_style: ProcessingStyle,
    /// Repack parameters used by bulk-style streams.
    #[serde(default)]
    pub repack: RepackSettings,
    /// Express parameters used by express-style streams.
    #[serde(default)]
    pub express: Option<ExpressSettings>,
    /// Observed-version to override-version mapping applied at provisioning.
    #[serde(default)]
    pub version_override: BTreeMap<CmsswVersion, CmsswVersion>,
}

/// Repack parameters for a bulk-style stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepackSettings {
    /// Repack processing version.
    #[serde(default = "default_processing_version")]
    pub processing_version: String,
}

impl Default for RepackSettings {
    fn default() -> Self {
        Self {
            processing_version: default_processing_version(),
        }
    }
}

/// Express parameters for an express-style stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpressSettings {
    /// Express processing version.
    #[serde(default = "default_processing_version")]
    pub processing_version: String,
    /// Output data tiers written by express processing.
    #[serde(default)]
    pub data_tiers: Vec<String>,
    /// Express skim producers, persisted as a delimited list when non-empty.
    #[serde(default)]
    pub producers: Vec<String>,
    /// Processing scenario assigned to the stream's placeholder dataset.
    pub scenario: Scenario,
    /// Conditions global tag.
    #[serde(default)]
    pub global_tag: String,
    /// Express processing configuration URL.
    #[serde(default)]
    pub processing_config_url: String,
    /// AlCa merge configuration URL.
    #[serde(default)]
    pub alca_merge_config_url: String,
}

// ============================================================================
// SECTION: Dataset Settings
// ============================================================================

/// Per-dataset processing policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSettings {
    /// Processing scenario for the dataset (and its error counterpart).
    #[serde(default)]
    pub scenario: Scenario,
    /// AlCa skim producers, persisted as a delimited list when non-empty.
    #[serde(default)]
    pub alca_producers: Vec<String>,
    /// Storage node holding the primary durable copy, when assigned.
    #[serde(default)]
    pub custodial_node: Option<NodeName>,
    /// Storage node holding the backup copy, when assigned.
    #[serde(default)]
    pub archival_node: Option<NodeName>,
    /// Transfer priority for the custodial copy.
    #[serde(default)]
    pub custodial_priority: TransferPriority,
    /// Whether custodial transfers are approved automatically.
    #[serde(default)]
    pub custodial_auto_approve: bool,
    /// Reconstruction parameters.
    #[serde(default)]
    pub reco: RecoSettings,
    /// Tier-1 skims run against the reconstructed dataset.
    #[serde(default)]
    pub tier1_skims: Vec<SkimSettings>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            scenario: Scenario::new(""),
            reco: RecoSettings::default(),
            alca_producers: Vec::new(),
            custodial_node: None,
            archival_node: None,
            custodial_priority: TransferPriority::default(),
            custodial_auto_approve: false,
            tier1_skims: Vec::new(),
        }
    }
}

/// Reconstruction parameters for one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecoSettings {
    /// Whether reconstruction runs for the dataset.
    #[serde(default)]
    pub do_reco: bool,
    /// Reconstruction software version.
    #[serde(default)]
    pub cmssw_version: CmsswVersion,
    /// Event-splitting factor for reconstruction jobs.
    #[serde(default = "default_event_split")]
    pub event_split: u32,
    /// Whether the RECO output tier is written.
    #[serde(default = "default_write_tier")]
    pub write_reco: bool,
    /// Whether the AOD output tier is written.
    #[serde(default = "default_write_tier")]
    pub write_aod: bool,
    /// Whether the DQM output tier is written.
    #[serde(default = "default_write_tier")]
    pub write_dqm: bool,
    /// Reconstruction processing version.
    #[serde(default = "default_processing_version")]
    pub processing_version: String,
    /// Conditions global tag.
    #[serde(default)]
    pub global_tag: String,
    /// Reconstruction configuration URL.
    #[serde(default)]
    pub config_url: String,
}

impl Default for RecoSettings {
    fn default() -> Self {
        Self {
            do_reco: false,
            cmssw_version: CmsswVersion::new(""),
            event_split: default_event_split(),
            write_reco: default_write_tier(),
            write_aod: default_write_tier(),
            write_dqm: default_write_tier(),
            processing_version: default_processing_version(),
            global_tag: String::new(),
            config_url: String::new(),
        }
    }
}

/// One Tier-1 skim job specification.
///
/// # Invariants
/// - A skim without an explicit `node` requires the owning dataset to
///   declare a custodial node; provisioning fails closed otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkimSettings {
    /// Input data tier the skim reads.
    pub data_tier: String,
    /// Skim name.
    pub skim_name: String,
    /// Explicit execution node; falls back to the dataset's custodial node.
    #[serde(default)]
    pub node: Option<NodeName>,
    /// Skim software version.
    pub cmssw_version: CmsswVersion,
    /// Whether the skim reads parent files alongside reconstructed input.
    #[serde(default)]
    pub two_file_read: bool,
    /// Skim processing version.
    #[serde(default = "default_processing_version")]
    pub processing_version: String,
    /// Conditions global tag.
    #[serde(default)]
    pub global_tag: String,
    /// Skim configuration URL.
    #[serde(default)]
    pub config_url: String,
}
