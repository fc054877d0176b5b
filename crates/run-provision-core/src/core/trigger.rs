// crates/run-provision-core/src/core/trigger.rs
// ============================================================================
// Module: Trigger Configuration Snapshot
// Description: Read-only stream/dataset/trigger-path mapping for one trigger key.
// Purpose: Carry the resolved trigger configuration into run provisioning.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! A [`TriggerConfig`] is the read-only snapshot retrieved from the trigger
//! configuration service for one trigger key. It exists only as an in-memory
//! lookup result for the duration of one provisioning call. `BTreeMap` keeps
//! iteration deterministic so staged plans are reproducible across calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DatasetName;
use crate::core::identifiers::StreamName;
use crate::core::identifiers::TriggerPath;

// ============================================================================
// SECTION: Trigger Configuration
// ============================================================================

/// Trigger configuration snapshot for one trigger key.
///
/// # Invariants
/// - Read-only once retrieved; provisioning never mutates the snapshot.
/// - A dataset's path list may repeat paths that also appear under other
///   datasets; the persistence layer deduplicates on unique keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Process name under which the trigger menu ran.
    pub process: String,
    /// Stream to dataset to ordered trigger-path mapping.
    pub mapping: BTreeMap<StreamName, BTreeMap<DatasetName, Vec<TriggerPath>>>,
}

impl TriggerConfig {
    /// Creates an empty snapshot for the given process name.
    #[must_use]
    pub fn new(process: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            mapping: BTreeMap::new(),
        }
    }

    /// Appends one dataset's trigger paths under a stream.
    pub fn insert_dataset(
        &mut self,
        stream: StreamName,
        dataset: DatasetName,
        paths: Vec<TriggerPath>,
    ) {
        self.mapping.entry(stream).or_default().insert(dataset, paths);
    }

    /// Returns `true` when the snapshot maps no streams.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
