// crates/run-provision-config/src/lib.rs
// ============================================================================
// Module: Run Provision Config Library
// Description: Loading, validation, and sample generation for pipeline settings.
// Purpose: Turn TOML configuration artifacts into validated PipelineConfig values.
// Dependencies: run-provision-core, toml, thiserror
// ============================================================================

//! ## Overview
//! This crate owns the configuration artifact surface for run provisioning:
//! parsing TOML into the core [`PipelineConfig`] model, structural
//! validation ahead of provisioning, and rendering sample artifacts for
//! operators. The model itself lives in `run-provision-core`; this crate
//! never extends it, only checks and materializes it.
//!
//! Validation is fail closed: a configuration that parses but breaks a
//! structural rule (an express stream without express parameters, an empty
//! node name) is rejected before any provisioning call sees it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod loader;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use loader::ConfigError;
pub use loader::load_pipeline_config;
pub use loader::parse_pipeline_config;
pub use loader::render_pipeline_config;
pub use loader::sample_config;
pub use validate::validate_pipeline_config;

pub use run_provision_core::PipelineConfig;
