// crates/run-provision-config/tests/stream_validation.rs
// ============================================================================
// Module: Stream Validation Tests
// Description: Structural rules over per-stream settings.
// Purpose: Reject stream configurations that would misbehave at provisioning.
// ============================================================================

//! Stream-level validation tests: express completeness, repack versions,
//! and version-override hygiene.

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
use run_provision_core::ExpressSettings;
use run_provision_core::GlobalSettings;
use run_provision_core::PipelineConfig;
use run_provision_core::ProcessingStyle;
use run_provision_core::Scenario;
use run_provision_core::StreamName;
use run_provision_core::StreamSettings;

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

fn express_settings() -> ExpressSettings {
    ExpressSettings {
        processing_version: "v1".to_string(),
        data_tiers: vec!["FEVT".to_string()],
        producers: Vec::new(),
        scenario: Scenario::new("pp"),
        global_tag: "GR_E_V1::All".to_string(),
        processing_config_url: "https://config.example.org/express/proc.py".to_string(),
        alca_merge_config_url: "https://config.example.org/express/alca.py".to_string(),
    }
}

fn invalid_message(config: &PipelineConfig) -> String {
    match validate_pipeline_config(config).expect_err("validation must fail") {
        ConfigError::Invalid(message) => message,
        other => panic!("expected invalid config, got {other}"),
    }
}

// ============================================================================
// SECTION: Global Rules
// ============================================================================

#[test]
fn empty_acquisition_era_is_rejected() {
    let mut config = base_config();
    config.global.acquisition_era.clear();
    assert!(invalid_message(&config).contains("acquisition_era"));
}

// ============================================================================
// SECTION: Express Rules
// ============================================================================

#[test]
fn express_stream_without_settings_is_rejected() {
    let mut config = base_config();
    config.streams.insert(
        StreamName::new("Express"),
        StreamSettings {
            processing_style: ProcessingStyle::Express,
            express: None,
            ..StreamSettings::default()
        },
    );
    assert!(invalid_message(&config).contains("no express settings"));
}

#[test]
fn express_stream_without_data_tiers_is_rejected() {
    let mut config = base_config();
    let mut express = express_settings();
    express.data_tiers.clear();
    config.streams.insert(
        StreamName::new("Express"),
        StreamSettings {
            processing_style: ProcessingStyle::Express,
            express: Some(express),
            ..StreamSettings::default()
        },
    );
    assert!(invalid_message(&config).contains("data tiers"));
}

#[test]
fn express_stream_without_scenario_is_rejected() {
    let mut config = base_config();
    let mut express = express_settings();
    express.scenario = Scenario::new("");
    config.streams.insert(
        StreamName::new("Express"),
        StreamSettings {
            processing_style: ProcessingStyle::Express,
            express: Some(express),
            ..StreamSettings::default()
        },
    );
    assert!(invalid_message(&config).contains("scenario"));
}

#[test]
fn complete_express_stream_passes() {
    let mut config = base_config();
    config.streams.insert(
        StreamName::new("Express"),
        StreamSettings {
            processing_style: ProcessingStyle::Express,
            express: Some(express_settings()),
            ..StreamSettings::default()
        },
    );
    validate_pipeline_config(&config).expect("complete express stream");
}

// ============================================================================
// SECTION: Bulk Rules
// ============================================================================

#[test]
fn bulk_stream_without_repack_version_is_rejected() {
    let mut config = base_config();
    let mut settings = StreamSettings::default();
    settings.repack.processing_version.clear();
    config.streams.insert(StreamName::new("A"), settings);
    assert!(invalid_message(&config).contains("repack processing version"));
}

#[test]
fn empty_version_override_entry_is_rejected() {
    let mut config = base_config();
    let mut settings = StreamSettings::default();
    settings
        .version_override
        .insert(CmsswVersion::new("CMSSW_14_0_0"), CmsswVersion::new(""));
    config.streams.insert(StreamName::new("A"), settings);
    assert!(invalid_message(&config).contains("version-override"));
}
