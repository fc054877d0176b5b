// crates/run-provision-core/src/runtime/stream_plan.rs
// ============================================================================
// Module: Stream Provision Plan
// Description: Staged row batches for one run/stream-configuration call.
// Purpose: Resolve stream and dataset policies into typed batches applied atomically.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! A [`StreamPlan`] is the fully-staged output of resolving one stream's
//! processing configuration plus the per-dataset policies of every dataset
//! bound to the (run, stream) pair. Building is pure and fails closed on
//! unresolvable skim nodes, so a failing call stages zero writes. Apply
//! order is fixed, and optional groups are written only when non-empty —
//! downstream consumers read row absence as "not configured".

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::CmsswVersion;
use crate::core::identifiers::DatasetName;
use crate::core::identifiers::NodeName;
use crate::core::identifiers::RunNumber;
use crate::core::identifiers::StreamName;
use crate::core::rows::DatasetScenarioRow;
use crate::core::rows::LIST_DELIMITER;
use crate::core::rows::ErrorDatasetRow;
use crate::core::rows::ExpressConfigRow;
use crate::core::rows::ProcessingStyle;
use crate::core::rows::RecoConfigRow;
use crate::core::rows::RepackConfigRow;
use crate::core::rows::SkimConfigRow;
use crate::core::rows::SpecialDatasetRow;
use crate::core::rows::StorageAssignmentRow;
use crate::core::rows::StreamDatasetRow;
use crate::core::rows::StreamOverrideRow;
use crate::core::rows::StreamStyleRow;
use crate::core::rows::TransferPriority;
use crate::core::rows::error_dataset_name;
use crate::core::rows::express_placeholder_dataset;
use crate::core::rows::join_labels;
use crate::core::settings::DatasetSettings;
use crate::core::settings::PipelineConfig;
use crate::core::settings::StreamSettings;
use crate::interfaces::ProvisionTx;
use crate::interfaces::StoreError;
use crate::runtime::ProvisionError;

// ============================================================================
// SECTION: Stream Plan
// ============================================================================

/// Staged row batches for one (run, stream) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPlan {
    /// Dataset registrations (placeholder and error datasets).
    pub datasets: Vec<DatasetName>,
    /// Dataset-to-stream associations scoped to this run.
    pub stream_datasets: Vec<StreamDatasetRow>,
    /// Processing-style row; always written.
    pub stream_style: StreamStyleRow,
    /// Repack configuration; bulk-style streams only.
    pub repack_config: Option<RepackConfigRow>,
    /// Express configuration; express-style streams only.
    pub express_config: Option<ExpressConfigRow>,
    /// Placeholder-dataset marker; express-style streams only.
    pub special_dataset: Option<SpecialDatasetRow>,
    /// Scenario associations for placeholder, real, and error datasets.
    pub dataset_scenarios: Vec<DatasetScenarioRow>,
    /// Software versions referenced by overrides, reconstruction, and skims.
    pub software_versions: Vec<CmsswVersion>,
    /// Software-version override, when the observed version maps to one.
    pub stream_override: Option<StreamOverrideRow>,
    /// Error-catch dataset registrations.
    pub error_datasets: Vec<ErrorDatasetRow>,
    /// Reconstruction-policy rows for real and error datasets.
    pub reco_configs: Vec<RecoConfigRow>,
    /// Storage node registrations.
    pub storage_nodes: Vec<NodeName>,
    /// Storage-destination assignments.
    pub storage_assignments: Vec<StorageAssignmentRow>,
    /// Tier-1 skim job specifications.
    pub skim_configs: Vec<SkimConfigRow>,
}

impl StreamPlan {
    /// Resolves stream and dataset policies into staged batches.
    ///
    /// `datasets` is the set currently bound to the (run, stream) pair;
    /// `online_version` is the software version observed at acquisition.
    /// Per-dataset policy staging applies to bulk-style streams only.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingExpressSettings`] for an
    /// express-style stream without express parameters, and
    /// [`ProvisionError::SkimNodeUnresolved`] when a skim resolves to no
    /// execution node. Either failure stages zero writes.
    pub fn build(
        config: &PipelineConfig,
        run: RunNumber,
        stream: &StreamName,
        settings: &StreamSettings,
        online_version: Option<&CmsswVersion>,
        datasets: &[DatasetName],
    ) -> Result<Self, ProvisionError> {
        let mut plan = Self {
            datasets: Vec::new(),
            stream_datasets: Vec::new(),
            stream_style: StreamStyleRow {
                run,
                stream: stream.clone(),
                style: settings.processing_style,
            },
            repack_config: None,
            express_config: None,
            special_dataset: None,
            dataset_scenarios: Vec::new(),
            software_versions: Vec::new(),
            stream_override: None,
            error_datasets: Vec::new(),
            reco_configs: Vec::new(),
            storage_nodes: Vec::new(),
            storage_assignments: Vec::new(),
            skim_configs: Vec::new(),
        };

        match settings.processing_style {
            ProcessingStyle::Bulk => {
                plan.repack_config = Some(RepackConfigRow {
                    run,
                    stream: stream.clone(),
                    processing_version: settings.repack.processing_version.clone(),
                });
            }
            ProcessingStyle::Express => {
                let express = settings.express.as_ref().ok_or_else(|| {
                    ProvisionError::MissingExpressSettings {
                        stream: stream.clone(),
                    }
                })?;
                plan.express_config = Some(ExpressConfigRow {
                    run,
                    stream: stream.clone(),
                    processing_version: express.processing_version.clone(),
                    write_tiers: express.data_tiers.join(LIST_DELIMITER),
                    write_skims: join_labels(&express.producers),
                    global_tag: express.global_tag.clone(),
                    processing_config_url: express.processing_config_url.clone(),
                    alca_merge_config_url: express.alca_merge_config_url.clone(),
                });
                let placeholder = express_placeholder_dataset(stream);
                plan.datasets.push(placeholder.clone());
                plan.stream_datasets.push(StreamDatasetRow {
                    run,
                    dataset: placeholder.clone(),
                    stream: stream.clone(),
                });
                plan.special_dataset = Some(SpecialDatasetRow {
                    stream: stream.clone(),
                    dataset: placeholder.clone(),
                });
                plan.dataset_scenarios.push(DatasetScenarioRow {
                    run,
                    dataset: placeholder,
                    scenario: express.scenario.clone(),
                });
            }
        }

        if let Some(observed) = online_version
            && let Some(override_version) = settings.version_override.get(observed)
        {
            plan.software_versions.push(override_version.clone());
            plan.stream_override = Some(StreamOverrideRow {
                run,
                stream: stream.clone(),
                override_version: override_version.clone(),
            });
        }

        if settings.processing_style == ProcessingStyle::Bulk {
            for dataset in datasets {
                let dataset_settings = config.dataset_or_default(dataset);
                plan.stage_bulk_dataset(run, stream, dataset, &dataset_settings)?;
            }
        }

        Ok(plan)
    }

    /// Stages the full policy set for one bulk-stream dataset.
    fn stage_bulk_dataset(
        &mut self,
        run: RunNumber,
        stream: &StreamName,
        dataset: &DatasetName,
        settings: &DatasetSettings,
    ) -> Result<(), ProvisionError> {
        self.dataset_scenarios.push(DatasetScenarioRow {
            run,
            dataset: dataset.clone(),
            scenario: settings.scenario.clone(),
        });

        let error_dataset = error_dataset_name(dataset);
        self.datasets.push(error_dataset.clone());
        self.stream_datasets.push(StreamDatasetRow {
            run,
            dataset: error_dataset.clone(),
            stream: stream.clone(),
        });
        self.error_datasets.push(ErrorDatasetRow {
            parent: dataset.clone(),
            error: error_dataset.clone(),
        });
        self.dataset_scenarios.push(DatasetScenarioRow {
            run,
            dataset: error_dataset.clone(),
            scenario: settings.scenario.clone(),
        });

        self.software_versions.push(settings.reco.cmssw_version.clone());

        let write_skims = join_labels(&settings.alca_producers);
        self.reco_configs.push(RecoConfigRow {
            run,
            dataset: dataset.clone(),
            do_reco: settings.reco.do_reco,
            cmssw_version: settings.reco.cmssw_version.clone(),
            event_split: settings.reco.event_split,
            write_reco: settings.reco.write_reco,
            write_aod: settings.reco.write_aod,
            write_dqm: settings.reco.write_dqm,
            processing_version: settings.reco.processing_version.clone(),
            write_skims: write_skims.clone(),
            global_tag: settings.reco.global_tag.clone(),
            config_url: settings.reco.config_url.clone(),
        });
        // Error datasets never reconstruct but keep the parent's technical
        // parameters so downstream merge/cleanup reads consistent metadata.
        self.reco_configs.push(RecoConfigRow {
            run,
            dataset: error_dataset.clone(),
            do_reco: false,
            cmssw_version: settings.reco.cmssw_version.clone(),
            event_split: settings.reco.event_split,
            write_reco: settings.reco.write_reco,
            write_aod: settings.reco.write_aod,
            write_dqm: settings.reco.write_dqm,
            processing_version: settings.reco.processing_version.clone(),
            write_skims,
            global_tag: settings.reco.global_tag.clone(),
            config_url: settings.reco.config_url.clone(),
        });

        if let Some(custodial) = &settings.custodial_node {
            self.storage_nodes.push(custodial.clone());
            self.storage_assignments.push(StorageAssignmentRow {
                run,
                dataset: dataset.clone(),
                node: custodial.clone(),
                custodial: true,
                request_only: !settings.custodial_auto_approve,
                priority: settings.custodial_priority,
            });
        }
        if let Some(archival) = &settings.archival_node {
            self.storage_nodes.push(archival.clone());
            self.storage_assignments.push(StorageAssignmentRow {
                run,
                dataset: dataset.clone(),
                node: archival.clone(),
                custodial: false,
                request_only: false,
                priority: TransferPriority::High,
            });
            self.storage_assignments.push(StorageAssignmentRow {
                run,
                dataset: error_dataset,
                node: archival.clone(),
                custodial: false,
                request_only: false,
                priority: TransferPriority::High,
            });
        }

        for skim in &settings.tier1_skims {
            self.software_versions.push(skim.cmssw_version.clone());
            let node = match &skim.node {
                Some(node) => {
                    self.storage_nodes.push(node.clone());
                    node.clone()
                }
                None => settings.custodial_node.clone().ok_or_else(|| {
                    ProvisionError::SkimNodeUnresolved {
                        dataset: dataset.clone(),
                        skim: skim.skim_name.clone(),
                    }
                })?,
            };
            self.skim_configs.push(SkimConfigRow {
                run,
                dataset: dataset.clone(),
                data_tier: skim.data_tier.clone(),
                skim_name: skim.skim_name.clone(),
                node,
                cmssw_version: skim.cmssw_version.clone(),
                two_file_read: skim.two_file_read,
                processing_version: skim.processing_version.clone(),
                global_tag: skim.global_tag.clone(),
                config_url: skim.config_url.clone(),
            });
        }

        Ok(())
    }

    /// Applies every staged batch against an open transaction, in order.
    ///
    /// Dataset registrations, stream associations, and the stream-style row
    /// always write; every other group writes only when non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] from the first failing operation; the caller
    /// owns the transaction and must roll it back.
    pub fn apply<T: ProvisionTx>(&self, tx: &mut T) -> Result<(), StoreError> {
        tx.insert_datasets(&self.datasets)?;
        tx.insert_stream_datasets(&self.stream_datasets)?;
        tx.insert_stream_style(&self.stream_style)?;
        if let Some(repack) = &self.repack_config {
            tx.insert_repack_config(repack)?;
        }
        if let Some(express) = &self.express_config {
            tx.insert_express_config(express)?;
        }
        if let Some(special) = &self.special_dataset {
            tx.insert_special_dataset(special)?;
        }
        if !self.dataset_scenarios.is_empty() {
            tx.insert_dataset_scenarios(&self.dataset_scenarios)?;
        }
        if !self.software_versions.is_empty() {
            tx.insert_software_versions(&self.software_versions)?;
        }
        if let Some(stream_override) = &self.stream_override {
            tx.update_stream_override(stream_override)?;
        }
        if !self.error_datasets.is_empty() {
            tx.insert_error_datasets(&self.error_datasets)?;
        }
        if !self.reco_configs.is_empty() {
            tx.insert_reco_configs(&self.reco_configs)?;
        }
        if !self.storage_nodes.is_empty() {
            tx.insert_storage_nodes(&self.storage_nodes)?;
        }
        if !self.storage_assignments.is_empty() {
            tx.insert_storage_assignments(&self.storage_assignments)?;
        }
        if !self.skim_configs.is_empty() {
            tx.insert_skim_configs(&self.skim_configs)?;
        }
        Ok(())
    }
}
