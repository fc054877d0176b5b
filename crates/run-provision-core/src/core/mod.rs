// crates/run-provision-core/src/core/mod.rs
// ============================================================================
// Module: Run Provision Core Types
// Description: Identifiers, row records, trigger snapshots, and settings.
// Purpose: Group the plain-data types shared across the provisioning runtime.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core plain-data types: canonical identifiers, the typed row records bound
//! by the persistence layer, the trigger configuration snapshot, and the
//! declarative pipeline settings model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod rows;
pub mod settings;
pub mod trigger;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::CmsswVersion;
pub use identifiers::DatasetName;
pub use identifiers::NodeName;
pub use identifiers::RunNumber;
pub use identifiers::Scenario;
pub use identifiers::StreamName;
pub use identifiers::TriggerKey;
pub use identifiers::TriggerPath;
pub use rows::DatasetScenarioRow;
pub use rows::DatasetTriggerRow;
pub use rows::ErrorDatasetRow;
pub use rows::ExpressConfigRow;
pub use rows::LIST_DELIMITER;
pub use rows::LOCAL_RUN_ERA;
pub use rows::LOCAL_RUN_PROCESS;
pub use rows::ProcessingStyle;
pub use rows::RecoConfigRow;
pub use rows::RepackConfigRow;
pub use rows::RunUpdate;
pub use rows::SkimConfigRow;
pub use rows::SpecialDatasetRow;
pub use rows::StorageAssignmentRow;
pub use rows::StreamDatasetRow;
pub use rows::StreamOverrideRow;
pub use rows::StreamStyleRow;
pub use rows::TransferPriority;
pub use rows::error_dataset_name;
pub use rows::express_placeholder_dataset;
pub use rows::join_labels;
pub use settings::DatasetSettings;
pub use settings::ExpressSettings;
pub use settings::GlobalSettings;
pub use settings::PipelineConfig;
pub use settings::RecoSettings;
pub use settings::RepackSettings;
pub use settings::SkimSettings;
pub use settings::StreamSettings;
pub use trigger::TriggerConfig;
