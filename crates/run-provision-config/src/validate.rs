// crates/run-provision-config/src/validate.rs
// ============================================================================
// Module: Config Validation
// Description: Structural validation of pipeline configurations.
// Purpose: Reject configurations that would fail or misbehave at provisioning.
// Dependencies: run-provision-core
// ============================================================================

//! ## Overview
//! Structural rules checked before a configuration reaches the provisioning
//! entry points. The runtime fails closed on the same conditions, but
//! catching them here surfaces mistakes at deploy time instead of at the
//! first affected run. Validation never mutates the configuration and stops
//! at the first violation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use run_provision_core::DatasetSettings;
use run_provision_core::PipelineConfig;
use run_provision_core::ProcessingStyle;

use crate::loader::ConfigError;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates structural rules over a parsed pipeline configuration.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first violated rule.
pub fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.global.acquisition_era.is_empty() {
        return Err(ConfigError::Invalid(
            "global.acquisition_era must not be empty".to_string(),
        ));
    }

    for (stream, settings) in &config.streams {
        match settings.processing_style {
            ProcessingStyle::Express => {
                let Some(express) = &settings.express else {
                    return Err(ConfigError::Invalid(format!(
                        "stream {stream} is express-style but has no express settings"
                    )));
                };
                if express.data_tiers.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "stream {stream} declares no express data tiers"
                    )));
                }
                if express.scenario.as_str().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "stream {stream} declares no express scenario"
                    )));
                }
            }
            ProcessingStyle::Bulk => {
                if settings.repack.processing_version.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "stream {stream} declares no repack processing version"
                    )));
                }
            }
        }
        for (observed, override_version) in &settings.version_override {
            if observed.as_str().is_empty() || override_version.as_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "stream {stream} carries an empty version-override entry"
                )));
            }
        }
    }

    for (dataset, settings) in &config.datasets {
        validate_dataset(dataset.as_str(), settings)?;
    }
    validate_dataset("dataset_defaults", &config.dataset_defaults)?;

    Ok(())
}

/// Validates one dataset's settings block.
fn validate_dataset(label: &str, settings: &DatasetSettings) -> Result<(), ConfigError> {
    if settings.reco.do_reco && settings.reco.cmssw_version.as_str().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "dataset {label} enables reconstruction without a CMSSW version"
        )));
    }
    if let Some(node) = &settings.custodial_node
        && node.as_str().is_empty()
    {
        return Err(ConfigError::Invalid(format!(
            "dataset {label} declares an empty custodial node"
        )));
    }
    if let Some(node) = &settings.archival_node
        && node.as_str().is_empty()
    {
        return Err(ConfigError::Invalid(format!(
            "dataset {label} declares an empty archival node"
        )));
    }
    for skim in &settings.tier1_skims {
        if skim.skim_name.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "dataset {label} carries a skim without a name"
            )));
        }
        if skim.data_tier.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "dataset {label} skim {} declares no data tier",
                skim.skim_name
            )));
        }
        if skim.cmssw_version.as_str().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "dataset {label} skim {} declares no CMSSW version",
                skim.skim_name
            )));
        }
        if let Some(node) = &skim.node
            && node.as_str().is_empty()
        {
            return Err(ConfigError::Invalid(format!(
                "dataset {label} skim {} declares an empty node",
                skim.skim_name
            )));
        }
    }
    Ok(())
}
