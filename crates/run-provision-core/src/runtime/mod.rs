// crates/run-provision-core/src/runtime/mod.rs
// ============================================================================
// Module: Run Provision Runtime
// Description: Entry points materializing run and run/stream configuration.
// Purpose: Stage typed row batches and commit them through one transaction each.
// Dependencies: thiserror, tracing, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime owns the two provisioning entry points invoked by the
//! external run-monitoring feeder:
//!
//! - [`Provisioner::configure_run`] resolves the trigger configuration for a
//!   run and writes global run metadata plus the stream/dataset/trigger
//!   mapping.
//! - [`Provisioner::configure_run_stream`] resolves one stream's processing
//!   configuration and the policies of every dataset bound to it.
//!
//! Both stage everything in memory first (pure plan builders), then execute
//! the staged batches inside exactly one transaction with commit-on-success
//! and rollback-on-failure. A failure before `begin` writes nothing; a
//! failure inside the transaction rolls back and re-signals the original
//! error. Local runs (no trigger key) take the minimal-metadata path.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod memory;
pub mod run_plan;
pub mod stream_plan;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::identifiers::DatasetName;
use crate::core::identifiers::RunNumber;
use crate::core::identifiers::StreamName;
use crate::core::rows::LOCAL_RUN_ERA;
use crate::core::rows::LOCAL_RUN_PROCESS;
use crate::core::settings::PipelineConfig;
use crate::core::trigger::TriggerConfig;
use crate::interfaces::ProvisionStore;
use crate::interfaces::ProvisionTx;
use crate::interfaces::StoreError;
use crate::interfaces::TriggerConfigError;
use crate::interfaces::TriggerConfigSource;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use memory::InMemoryProvisionStore;
pub use memory::InMemoryTx;
pub use memory::ProvisionTables;
pub use memory::RunMetadata;
pub use run_plan::RunPlan;
pub use stream_plan::StreamPlan;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Provisioning errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Persistence failures re-signal the underlying [`StoreError`] unchanged
///   after the transaction rolls back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// No trigger configuration could be resolved for a centrally-triggered run.
    #[error("no trigger configuration available for run {run}")]
    TriggerConfigUnavailable {
        /// Run the retrieval failed for.
        run: RunNumber,
    },
    /// An express-style stream carries no express parameters.
    #[error("stream {stream} is express-style but has no express settings")]
    MissingExpressSettings {
        /// Stream missing its express parameters.
        stream: StreamName,
    },
    /// A skim resolved to no execution node.
    #[error(
        "skim {skim} on dataset {dataset} has no node and the dataset declares no custodial node"
    )]
    SkimNodeUnresolved {
        /// Dataset owning the skim.
        dataset: DatasetName,
        /// Skim name.
        skim: String,
    },
    /// Trigger configuration retrieval failed.
    #[error(transparent)]
    TriggerConfig(#[from] TriggerConfigError),
    /// Persistence failed; the transaction was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Outcome of one [`Provisioner::configure_run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunProvisionOutcome {
    /// Centrally-triggered run: metadata and mapping written.
    Central,
    /// Local run: minimal placeholder metadata written, no mapping.
    Local,
}

/// Outcome of one [`Provisioner::configure_run_stream`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamProvisionOutcome {
    /// Stream configuration written.
    Configured,
    /// Local run: no stream configuration is known or needed.
    SkippedLocalRun,
}

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Run and run/stream configurator over an injected store and trigger source.
///
/// # Invariants
/// - Each entry point writes through exactly one transaction; partial
///   configuration state is never observable.
/// - The provisioner holds no state beyond its collaborators.
#[derive(Debug)]
pub struct Provisioner<S, T> {
    /// Backing provisioning store.
    store: S,
    /// Trigger configuration source.
    trigger_source: T,
}

impl<S, T> Provisioner<S, T>
where
    S: ProvisionStore,
    T: TriggerConfigSource,
{
    /// Creates a provisioner from its collaborators.
    #[must_use]
    pub const fn new(store: S, trigger_source: T) -> Self {
        Self {
            store,
            trigger_source,
        }
    }

    /// Returns a shared reference to the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns a mutable reference to the backing store.
    ///
    /// Store-specific seeding operations (run registration, observed online
    /// versions) go through this handle.
    #[must_use]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the provisioner and returns the backing store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Configures global run metadata and the stream/dataset/trigger mapping.
    ///
    /// Centrally-triggered runs resolve the trigger configuration (falling
    /// back to `reference` when the service has no snapshot) and write the
    /// flattened mapping in one transaction. Local runs write minimal
    /// placeholder metadata only.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::TriggerConfigUnavailable`] when neither the
    /// service nor `reference` yields a snapshot (nothing is written), and
    /// re-signals any [`StoreError`] after rolling the transaction back.
    pub fn configure_run(
        &mut self,
        config: &PipelineConfig,
        run: RunNumber,
        reference: Option<&TriggerConfig>,
    ) -> Result<RunProvisionOutcome, ProvisionError> {
        debug!(run = run.get(), "configure run");
        let Some(key) = self.store.trigger_key(run)? else {
            // Local run: one atomic metadata statement, no mapping rows.
            self.store.update_run_minimal(run, LOCAL_RUN_PROCESS, LOCAL_RUN_ERA)?;
            return Ok(RunProvisionOutcome::Local);
        };
        debug!(run = run.get(), key = key.as_str(), "trigger key resolved");

        let snapshot = match self.trigger_source.fetch(&key)? {
            Some(snapshot) => snapshot,
            None => match reference {
                Some(reference) => reference.clone(),
                None => return Err(ProvisionError::TriggerConfigUnavailable { run }),
            },
        };

        let plan = RunPlan::build(&config.global, run, &snapshot);
        let mut tx = self.store.begin()?;
        match plan.apply(&mut tx) {
            Ok(()) => {
                tx.commit()?;
                Ok(RunProvisionOutcome::Central)
            }
            Err(err) => {
                rollback_quietly(tx);
                Err(err.into())
            }
        }
    }

    /// Configures one stream's processing policies and its datasets' policies.
    ///
    /// Local runs are a no-op. Streams absent from the configuration
    /// synthesize a bulk/repack default. Per-dataset policy rows are staged
    /// for bulk-style streams only; express-style streams register their
    /// placeholder dataset instead.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::SkimNodeUnresolved`] or
    /// [`ProvisionError::MissingExpressSettings`] before any write, and
    /// re-signals any [`StoreError`] after rolling the transaction back.
    pub fn configure_run_stream(
        &mut self,
        config: &PipelineConfig,
        run: RunNumber,
        stream: &StreamName,
    ) -> Result<StreamProvisionOutcome, ProvisionError> {
        debug!(run = run.get(), stream = stream.as_str(), "configure run stream");
        if self.store.trigger_key(run)?.is_none() {
            return Ok(StreamProvisionOutcome::SkippedLocalRun);
        }

        let settings = config.stream_or_default(stream);
        let online_version = self.store.online_version(run, stream)?;
        let datasets = self.store.stream_datasets(run, stream)?;
        let plan = StreamPlan::build(
            config,
            run,
            stream,
            &settings,
            online_version.as_ref(),
            &datasets,
        )?;

        let mut tx = self.store.begin()?;
        match plan.apply(&mut tx) {
            Ok(()) => {
                tx.commit()?;
                Ok(StreamProvisionOutcome::Configured)
            }
            Err(err) => {
                rollback_quietly(tx);
                Err(err.into())
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rolls a transaction back, logging instead of masking the original error.
fn rollback_quietly<T: ProvisionTx>(tx: T) {
    if let Err(rollback_err) = tx.rollback() {
        warn!(error = %rollback_err, "rollback failed after provisioning error");
    }
}
