// crates/run-provision-config/tests/dataset_validation.rs
// ============================================================================
// Module: Dataset Validation Tests
// Description: Structural rules over per-dataset settings.
// Purpose: Reject dataset configurations that would misbehave at provisioning.
// ============================================================================

//! Dataset-level validation tests: reconstruction prerequisites, node
//! hygiene, skim completeness, and the dataset-defaults template.

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

use run_provision_config::ConfigError;
use run_provision_config::validate_pipeline_config;
use run_provision_core::CmsswVersion;
use run_provision_core::DatasetName;
use run_provision_core::DatasetSettings;
use run_provision_core::GlobalSettings;
use run_provision_core::NodeName;
use run_provision_core::PipelineConfig;
use run_provision_core::RecoSettings;
use run_provision_core::Scenario;
use run_provision_core::SkimSettings;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn base_config() -> PipelineConfig {
    PipelineConfig {
        global: GlobalSettings {
            acquisition_era: "Commissioning2026".to_string(),
            reco_timeout_secs: 3_600,
            reco_lock_timeout_secs: 300,
        },
        ..PipelineConfig::default()
    }
}

fn skim_settings() -> SkimSettings {
    SkimSettings {
        data_tier: "RECO".to_string(),
        skim_name: "MinBiasSkim".to_string(),
        node: Some(NodeName::new("T1_US_FNAL")),
        cmssw_version: CmsswVersion::new("CMSSW_14_0_2"),
        two_file_read: false,
        processing_version: "v1".to_string(),
        global_tag: "GR_R_V1::All".to_string(),
        config_url: "https://config.example.org/skim/minbias.py".to_string(),
    }
}

fn with_dataset(settings: DatasetSettings) -> PipelineConfig {
    let mut config = base_config();
    config.datasets.insert(DatasetName::new("MinimumBias"), settings);
    config
}

fn invalid_message(config: &PipelineConfig) -> String {
    match validate_pipeline_config(config).expect_err("validation must fail") {
        ConfigError::Invalid(message) => message,
        other => panic!("expected invalid config, got {other}"),
    }
}

// ============================================================================
// SECTION: Reconstruction Rules
// ============================================================================

#[test]
fn reconstruction_without_cmssw_version_is_rejected() {
    let config = with_dataset(DatasetSettings {
        scenario: Scenario::new("pp"),
        reco: RecoSettings {
            do_reco: true,
            ..RecoSettings::default()
        },
        ..DatasetSettings::default()
    });
    assert!(invalid_message(&config).contains("CMSSW version"));
}

#[test]
fn reconstruction_with_cmssw_version_passes() {
    let config = with_dataset(DatasetSettings {
        scenario: Scenario::new("pp"),
        reco: RecoSettings {
            do_reco: true,
            cmssw_version: CmsswVersion::new("CMSSW_14_0_1"),
            ..RecoSettings::default()
        },
        ..DatasetSettings::default()
    });
    validate_pipeline_config(&config).expect("reconstruction dataset");
}

// ============================================================================
// SECTION: Node Rules
// ============================================================================

#[test]
fn empty_custodial_node_is_rejected() {
    let config = with_dataset(DatasetSettings {
        custodial_node: Some(NodeName::new("")),
        ..DatasetSettings::default()
    });
    assert!(invalid_message(&config).contains("custodial node"));
}

#[test]
fn empty_archival_node_is_rejected() {
    let config = with_dataset(DatasetSettings {
        archival_node: Some(NodeName::new("")),
        ..DatasetSettings::default()
    });
    assert!(invalid_message(&config).contains("archival node"));
}

// ============================================================================
// SECTION: Skim Rules
// ============================================================================

#[test]
fn skim_without_name_is_rejected() {
    let mut skim = skim_settings();
    skim.skim_name.clear();
    let config = with_dataset(DatasetSettings {
        tier1_skims: vec![skim],
        ..DatasetSettings::default()
    });
    assert!(invalid_message(&config).contains("without a name"));
}

#[test]
fn skim_without_data_tier_is_rejected() {
    let mut skim = skim_settings();
    skim.data_tier.clear();
    let config = with_dataset(DatasetSettings {
        tier1_skims: vec![skim],
        ..DatasetSettings::default()
    });
    assert!(invalid_message(&config).contains("data tier"));
}

#[test]
fn skim_without_cmssw_version_is_rejected() {
    let mut skim = skim_settings();
    skim.cmssw_version = CmsswVersion::new("");
    let config = with_dataset(DatasetSettings {
        tier1_skims: vec![skim],
        ..DatasetSettings::default()
    });
    assert!(invalid_message(&config).contains("CMSSW version"));
}

#[test]
fn skim_with_empty_node_is_rejected() {
    let mut skim = skim_settings();
    skim.node = Some(NodeName::new(""));
    let config = with_dataset(DatasetSettings {
        tier1_skims: vec![skim],
        ..DatasetSettings::default()
    });
    assert!(invalid_message(&config).contains("empty node"));
}

// A skim without any node passes validation: the dataset's custodial node
// may still resolve it, and provisioning fails closed otherwise.
#[test]
fn skim_without_node_passes_validation() {
    let mut skim = skim_settings();
    skim.node = None;
    let config = with_dataset(DatasetSettings {
        tier1_skims: vec![skim],
        ..DatasetSettings::default()
    });
    validate_pipeline_config(&config).expect("nodeless skim");
}

// ============================================================================
// SECTION: Defaults Template
// ============================================================================

#[test]
fn dataset_defaults_template_is_validated() {
    let mut config = base_config();
    config.dataset_defaults.reco.do_reco = true;
    let message = invalid_message(&config);
    assert!(message.contains("dataset_defaults"));
    assert!(message.contains("CMSSW version"));
}
