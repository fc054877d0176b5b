// crates/run-provision-config/src/loader.rs
// ============================================================================
// Module: Config Loader
// Description: TOML parsing, file loading, and sample artifact generation.
// Purpose: Materialize PipelineConfig values from configuration artifacts.
// Dependencies: run-provision-core, toml, thiserror
// ============================================================================

//! ## Overview
//! Loading is two-phase: parse (strict TOML, unknown fields rejected by the
//! model's `deny_unknown_fields`) then validate
//! ([`crate::validate::validate_pipeline_config`]). [`load_pipeline_config`]
//! runs both phases; callers embedding configuration from another source can
//! run the phases separately. [`sample_config`] and
//! [`render_pipeline_config`] produce a representative artifact for
//! operator documentation and round-trip tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use run_provision_core::CmsswVersion;
use run_provision_core::DatasetName;
use run_provision_core::DatasetSettings;
use run_provision_core::ExpressSettings;
use run_provision_core::GlobalSettings;
use run_provision_core::NodeName;
use run_provision_core::PipelineConfig;
use run_provision_core::ProcessingStyle;
use run_provision_core::RecoSettings;
use run_provision_core::RepackSettings;
use run_provision_core::Scenario;
use run_provision_core::SkimSettings;
use run_provision_core::StreamName;
use run_provision_core::StreamSettings;
use run_provision_core::TransferPriority;
use thiserror::Error;

use crate::validate::validate_pipeline_config;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration artifact could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Configuration artifact could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Configuration parsed but breaks a structural rule.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Parses a TOML string into an unvalidated [`PipelineConfig`].
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the TOML is malformed or carries
/// unknown fields.
pub fn parse_pipeline_config(toml_str: &str) -> Result<PipelineConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Loads and validates a pipeline configuration from a TOML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Parse`] when it cannot be parsed, and
/// [`ConfigError::Invalid`] when validation rejects it.
pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    let config = parse_pipeline_config(&raw)?;
    validate_pipeline_config(&config)?;
    Ok(config)
}

/// Renders a pipeline configuration back into its TOML artifact form.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value cannot be serialized.
pub fn render_pipeline_config(config: &PipelineConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|err| ConfigError::Invalid(err.to_string()))
}

// ============================================================================
// SECTION: Sample Artifact
// ============================================================================

/// Returns a representative, valid pipeline configuration.
///
/// Used for operator documentation and round-trip tests: one bulk stream
/// with a version override, one express stream, one fully-specified dataset
/// with a Tier-1 skim, and non-trivial dataset defaults.
#[must_use]
pub fn sample_config() -> PipelineConfig {
    let mut config = PipelineConfig {
        global: GlobalSettings {
            acquisition_era: "Commissioning2026".to_string(),
            reco_timeout_secs: 3_600,
            reco_lock_timeout_secs: 300,
        },
        ..PipelineConfig::default()
    };

    let mut bulk = StreamSettings {
        processing_style: ProcessingStyle::Bulk,
        repack: RepackSettings {
            processing_version: "v1".to_string(),
        },
        ..StreamSettings::default()
    };
    bulk.version_override
        .insert(CmsswVersion::new("CMSSW_14_0_0"), CmsswVersion::new("CMSSW_14_0_1"));
    config.streams.insert(StreamName::new("A"), bulk);

    config.streams.insert(
        StreamName::new("Express"),
        StreamSettings {
            processing_style: ProcessingStyle::Express,
            express: Some(ExpressSettings {
                processing_version: "v1".to_string(),
                data_tiers: vec!["FEVT".to_string(), "ALCARECO".to_string()],
                producers: vec!["SiStripCalZeroBias".to_string()],
                scenario: Scenario::new("pp"),
                global_tag: "GR_E_V1::All".to_string(),
                processing_config_url: "https://config.example.org/express/proc.py".to_string(),
                alca_merge_config_url: "https://config.example.org/express/alca.py".to_string(),
            }),
            ..StreamSettings::default()
        },
    );

    config.datasets.insert(
        DatasetName::new("MinimumBias"),
        DatasetSettings {
            scenario: Scenario::new("pp"),
            reco: RecoSettings {
                do_reco: true,
                cmssw_version: CmsswVersion::new("CMSSW_14_0_1"),
                event_split: 2_000,
                write_reco: true,
                write_aod: true,
                write_dqm: true,
                processing_version: "v1".to_string(),
                global_tag: "GR_R_V1::All".to_string(),
                config_url: "https://config.example.org/reco/minbias.py".to_string(),
            },
            alca_producers: vec!["TkAlMinBias".to_string()],
            custodial_node: Some(NodeName::new("T1_US_FNAL")),
            archival_node: Some(NodeName::new("T0_CH_CERN")),
            custodial_priority: TransferPriority::High,
            custodial_auto_approve: true,
            tier1_skims: vec![SkimSettings {
                data_tier: "RECO".to_string(),
                skim_name: "MinBiasSkim".to_string(),
                node: None,
                cmssw_version: CmsswVersion::new("CMSSW_14_0_1"),
                two_file_read: false,
                processing_version: "v1".to_string(),
                global_tag: "GR_R_V1::All".to_string(),
                config_url: "https://config.example.org/skim/minbias.py".to_string(),
            }],
        },
    );

    config.dataset_defaults = DatasetSettings {
        scenario: Scenario::new("pp"),
        ..DatasetSettings::default()
    };

    config
}
