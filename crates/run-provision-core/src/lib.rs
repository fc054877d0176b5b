// crates/run-provision-core/src/lib.rs
// ============================================================================
// Module: Run Provision Core Library
// Description: Domain types, interfaces, and runtime for run provisioning.
// Purpose: Materialize run and run/stream processing configuration atomically.
// Dependencies: serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! Run Provision Core turns a run number, a trigger configuration snapshot,
//! and the declarative pipeline settings into relational configuration rows,
//! written through a strongly-typed store interface inside exactly one
//! transaction per entry-point call.
//!
//! Invariants:
//! - Every row written by one provisioning call commits atomically; partial
//!   run or run/stream configuration is never observable.
//! - Insert operations deduplicate on unique keys at the persistence
//!   boundary, so re-invoking an entry point with identical inputs is a
//!   no-op.
//! - Staging is pure and precedes the transaction; staging failures write
//!   nothing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::CmsswVersion;
pub use self::core::DatasetName;
pub use self::core::DatasetScenarioRow;
pub use self::core::DatasetSettings;
pub use self::core::DatasetTriggerRow;
pub use self::core::ErrorDatasetRow;
pub use self::core::ExpressConfigRow;
pub use self::core::ExpressSettings;
pub use self::core::GlobalSettings;
pub use self::core::LIST_DELIMITER;
pub use self::core::LOCAL_RUN_ERA;
pub use self::core::LOCAL_RUN_PROCESS;
pub use self::core::NodeName;
pub use self::core::PipelineConfig;
pub use self::core::ProcessingStyle;
pub use self::core::RecoConfigRow;
pub use self::core::RecoSettings;
pub use self::core::RepackConfigRow;
pub use self::core::RepackSettings;
pub use self::core::RunNumber;
pub use self::core::RunUpdate;
pub use self::core::Scenario;
pub use self::core::SkimConfigRow;
pub use self::core::SkimSettings;
pub use self::core::SpecialDatasetRow;
pub use self::core::StorageAssignmentRow;
pub use self::core::StreamDatasetRow;
pub use self::core::StreamName;
pub use self::core::StreamOverrideRow;
pub use self::core::StreamSettings;
pub use self::core::StreamStyleRow;
pub use self::core::TransferPriority;
pub use self::core::TriggerConfig;
pub use self::core::TriggerKey;
pub use self::core::TriggerPath;
pub use self::core::error_dataset_name;
pub use self::core::express_placeholder_dataset;
pub use self::core::join_labels;
pub use interfaces::ProvisionStore;
pub use interfaces::ProvisionTx;
pub use interfaces::StoreError;
pub use interfaces::TriggerConfigError;
pub use interfaces::TriggerConfigSource;
pub use runtime::ProvisionError;
pub use runtime::Provisioner;
pub use runtime::RunProvisionOutcome;
pub use runtime::StreamProvisionOutcome;
