// crates/run-provision-core/src/runtime/run_plan.rs
// ============================================================================
// Module: Run Provision Plan
// Description: Staged row batches for one run-configuration call.
// Purpose: Flatten a trigger snapshot into typed batches applied in one transaction.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A [`RunPlan`] is the fully-staged output of flattening one trigger
//! configuration snapshot: the global run metadata row plus the four
//! association sets (streams, datasets, stream-dataset pairs, dataset-trigger
//! pairs). Building is pure; nothing touches the store until
//! [`RunPlan::apply`] runs inside an open transaction. Repeats across
//! mappings stay in the plan — the persistence layer deduplicates on each
//! operation's unique key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::DatasetName;
use crate::core::identifiers::RunNumber;
use crate::core::identifiers::StreamName;
use crate::core::identifiers::TriggerPath;
use crate::core::rows::DatasetTriggerRow;
use crate::core::rows::RunUpdate;
use crate::core::rows::StreamDatasetRow;
use crate::core::settings::GlobalSettings;
use crate::core::trigger::TriggerConfig;
use crate::interfaces::ProvisionTx;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Run Plan
// ============================================================================

/// Staged row batches for one centrally-triggered run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Global run metadata row.
    pub run_update: RunUpdate,
    /// Stream names referenced by the snapshot.
    pub streams: Vec<StreamName>,
    /// Primary dataset names referenced by the snapshot.
    pub datasets: Vec<DatasetName>,
    /// Dataset-to-stream associations scoped to this run.
    pub stream_datasets: Vec<StreamDatasetRow>,
    /// Trigger path names referenced by the snapshot.
    pub triggers: Vec<TriggerPath>,
    /// Dataset-to-trigger associations scoped to this run.
    pub dataset_triggers: Vec<DatasetTriggerRow>,
}

impl RunPlan {
    /// Flattens a trigger snapshot into staged batches for one run.
    ///
    /// The process name comes from the snapshot; the acquisition era and
    /// timeout values come from the global settings.
    #[must_use]
    pub fn build(global: &GlobalSettings, run: RunNumber, snapshot: &TriggerConfig) -> Self {
        let mut plan = Self {
            run_update: RunUpdate {
                run,
                process: snapshot.process.clone(),
                acquisition_era: global.acquisition_era.clone(),
                reco_timeout_secs: global.reco_timeout_secs,
                reco_lock_timeout_secs: global.reco_lock_timeout_secs,
            },
            streams: Vec::new(),
            datasets: Vec::new(),
            stream_datasets: Vec::new(),
            triggers: Vec::new(),
            dataset_triggers: Vec::new(),
        };
        for (stream, dataset_map) in &snapshot.mapping {
            plan.streams.push(stream.clone());
            for (dataset, paths) in dataset_map {
                plan.datasets.push(dataset.clone());
                plan.stream_datasets.push(StreamDatasetRow {
                    run,
                    dataset: dataset.clone(),
                    stream: stream.clone(),
                });
                for path in paths {
                    plan.triggers.push(path.clone());
                    plan.dataset_triggers.push(DatasetTriggerRow {
                        run,
                        trigger: path.clone(),
                        dataset: dataset.clone(),
                    });
                }
            }
        }
        plan
    }

    /// Applies every staged batch against an open transaction, in order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] from the first failing operation; the caller
    /// owns the transaction and must roll it back.
    pub fn apply<T: ProvisionTx>(&self, tx: &mut T) -> Result<(), StoreError> {
        tx.update_run(&self.run_update)?;
        tx.insert_streams(&self.streams)?;
        tx.insert_datasets(&self.datasets)?;
        tx.insert_stream_datasets(&self.stream_datasets)?;
        tx.insert_triggers(&self.triggers)?;
        tx.insert_dataset_triggers(&self.dataset_triggers)?;
        Ok(())
    }
}
