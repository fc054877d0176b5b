// crates/run-provision-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Provision Store
// Description: Durable ProvisionStore backed by SQLite WAL.
// Purpose: Persist provisioning rows with unique-key idempotence and one
//          transaction per provisioning call.
// Dependencies: run-provision-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements the durable [`ProvisionStore`] using `SQLite`.
//! Each named operation writes one table keyed by the operation's unique
//! key; association inserts use `INSERT OR IGNORE` so idempotent
//! re-submission never duplicates rows. Run metadata updates fail closed on
//! unknown runs — run registration belongs to the external feeder via
//! [`SqliteProvisionStore::register_run`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use run_provision_core::CmsswVersion;
use run_provision_core::DatasetName;
use run_provision_core::DatasetScenarioRow;
use run_provision_core::DatasetTriggerRow;
use run_provision_core::ErrorDatasetRow;
use run_provision_core::ExpressConfigRow;
use run_provision_core::NodeName;
use run_provision_core::ProvisionStore;
use run_provision_core::ProvisionTx;
use run_provision_core::RecoConfigRow;
use run_provision_core::RepackConfigRow;
use run_provision_core::RunNumber;
use run_provision_core::RunUpdate;
use run_provision_core::SkimConfigRow;
use run_provision_core::SpecialDatasetRow;
use run_provision_core::StorageAssignmentRow;
use run_provision_core::StoreError;
use run_provision_core::StreamDatasetRow;
use run_provision_core::StreamName;
use run_provision_core::StreamOverrideRow;
use run_provision_core::StreamStyleRow;
use run_provision_core::TriggerKey;
use run_provision_core::TriggerPath;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` provision store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a configuration with defaults for the given database path.
    #[must_use]
    pub fn for_path(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding full row payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Db(message),
            SqliteStoreError::Invalid(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Invalid(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed provision store with WAL support.
///
/// # Invariants
/// - One connection per store; all mutations of one provisioning call run
///   inside one `rusqlite` transaction.
/// - Insert operations deduplicate on the table's primary key.
#[derive(Debug)]
pub struct SqliteProvisionStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Owned `SQLite` connection.
    connection: Connection,
}

impl SqliteProvisionStore {
    /// Opens an `SQLite`-backed provision store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        debug!(path = %config.path.display(), "sqlite provision store opened");
        Ok(Self { config, connection })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        self.connection
            .execute("SELECT 1", [])
            .map(|_| ())
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
    }

    /// Records a newly-observed run and its trigger key, if any.
    ///
    /// Re-registering an existing run is a no-op. Registration belongs to
    /// the external feeder; provisioning itself never creates run rows.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn register_run(
        &mut self,
        run: RunNumber,
        trigger_key: Option<&TriggerKey>,
    ) -> Result<(), SqliteStoreError> {
        let mut stmt = self
            .connection
            .prepare_cached("INSERT OR IGNORE INTO run (run_number, trigger_key) VALUES (?1, ?2)")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        stmt.execute(params![i64::from(run.get()), trigger_key.map(TriggerKey::as_str)])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Records the software version observed for a stream at acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn set_online_version(
        &mut self,
        run: RunNumber,
        stream: &StreamName,
        version: &CmsswVersion,
    ) -> Result<(), SqliteStoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "INSERT OR REPLACE INTO stream_online_version (run_number, stream, \
                 online_version) VALUES (?1, ?2, ?3)",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        stmt.execute(params![i64::from(run.get()), stream.as_str(), version.as_str()])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }
}

impl ProvisionStore for SqliteProvisionStore {
    type Tx<'conn>
        = SqliteProvisionTx<'conn>
    where
        Self: 'conn;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        let tx = self
            .connection
            .transaction()
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(SqliteProvisionTx { tx })
    }

    fn trigger_key(&self, run: RunNumber) -> Result<Option<TriggerKey>, StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached("SELECT trigger_key FROM run WHERE run_number = ?1")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let key: Option<Option<String>> = stmt
            .query_row(params![i64::from(run.get())], |row| row.get(0))
            .optional()
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(key.flatten().map(TriggerKey::new))
    }

    fn stream_datasets(
        &self,
        run: RunNumber,
        stream: &StreamName,
    ) -> Result<Vec<DatasetName>, StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "SELECT dataset FROM run_stream_dataset WHERE run_number = ?1 AND stream = ?2 \
                 ORDER BY dataset",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![i64::from(run.get()), stream.as_str()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let mut datasets = Vec::new();
        for row in rows {
            let name = row.map_err(|err| StoreError::Db(err.to_string()))?;
            datasets.push(DatasetName::new(name));
        }
        Ok(datasets)
    }

    fn online_version(
        &self,
        run: RunNumber,
        stream: &StreamName,
    ) -> Result<Option<CmsswVersion>, StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "SELECT online_version FROM stream_online_version WHERE run_number = ?1 AND \
                 stream = ?2",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let version: Option<String> = stmt
            .query_row(params![i64::from(run.get()), stream.as_str()], |row| row.get(0))
            .optional()
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(version.map(CmsswVersion::new))
    }

    fn update_run_minimal(
        &mut self,
        run: RunNumber,
        process: &str,
        acquisition_era: &str,
    ) -> Result<(), StoreError> {
        let mut stmt = self
            .connection
            .prepare_cached(
                "UPDATE run SET process = ?2, acquisition_era = ?3 WHERE run_number = ?1",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let affected = stmt
            .execute(params![i64::from(run.get()), process, acquisition_era])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        if affected == 0 {
            return Err(StoreError::Invalid(format!("unknown run {run}")));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Unit of work over [`SqliteProvisionStore`].
///
/// # Invariants
/// - Nothing becomes visible before [`ProvisionTx::commit`]; dropping the
///   handle rolls the underlying `SQLite` transaction back.
pub struct SqliteProvisionTx<'conn> {
    /// Underlying `SQLite` transaction.
    tx: rusqlite::Transaction<'conn>,
}

impl ProvisionTx for SqliteProvisionTx<'_> {
    fn update_run(&mut self, row: &RunUpdate) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "UPDATE run SET process = ?2, acquisition_era = ?3, reco_timeout_secs = ?4, \
                 reco_lock_timeout_secs = ?5 WHERE run_number = ?1",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        let affected = stmt
            .execute(params![
                i64::from(row.run.get()),
                row.process.as_str(),
                row.acquisition_era.as_str(),
                i64::from(row.reco_timeout_secs),
                i64::from(row.reco_lock_timeout_secs)
            ])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        if affected == 0 {
            return Err(StoreError::Invalid(format!("unknown run {}", row.run)));
        }
        Ok(())
    }

    fn insert_streams(&mut self, rows: &[StreamName]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT OR IGNORE INTO stream (name) VALUES (?1)")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![row.as_str()])
                .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_datasets(&mut self, rows: &[DatasetName]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT OR IGNORE INTO primary_dataset (name) VALUES (?1)")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![row.as_str()])
                .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_stream_datasets(&mut self, rows: &[StreamDatasetRow]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO run_stream_dataset (run_number, dataset, stream) VALUES \
                 (?1, ?2, ?3)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![
                i64::from(row.run.get()),
                row.dataset.as_str(),
                row.stream.as_str()
            ])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_triggers(&mut self, rows: &[TriggerPath]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT OR IGNORE INTO trigger_path (name) VALUES (?1)")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![row.as_str()])
                .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_dataset_triggers(&mut self, rows: &[DatasetTriggerRow]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO run_dataset_trigger (run_number, trigger, dataset) VALUES \
                 (?1, ?2, ?3)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![
                i64::from(row.run.get()),
                row.trigger.as_str(),
                row.dataset.as_str()
            ])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_stream_style(&mut self, row: &StreamStyleRow) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO run_stream_style (run_number, stream, style) VALUES (?1, \
                 ?2, ?3)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        stmt.execute(params![
            i64::from(row.run.get()),
            row.stream.as_str(),
            row.style.as_str()
        ])
        .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn insert_repack_config(&mut self, row: &RepackConfigRow) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO repack_config (run_number, stream, processing_version) \
                 VALUES (?1, ?2, ?3)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        stmt.execute(params![
            i64::from(row.run.get()),
            row.stream.as_str(),
            row.processing_version.as_str()
        ])
        .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn insert_express_config(&mut self, row: &ExpressConfigRow) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO express_config (run_number, stream, processing_version, \
                 write_tiers, write_skims, global_tag, processing_config_url, \
                 alca_merge_config_url) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        stmt.execute(params![
            i64::from(row.run.get()),
            row.stream.as_str(),
            row.processing_version.as_str(),
            row.write_tiers.as_str(),
            row.write_skims.as_deref(),
            row.global_tag.as_str(),
            row.processing_config_url.as_str(),
            row.alca_merge_config_url.as_str()
        ])
        .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn insert_special_dataset(&mut self, row: &SpecialDatasetRow) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO special_dataset (stream, dataset) VALUES (?1, ?2)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        stmt.execute(params![row.stream.as_str(), row.dataset.as_str()])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn insert_dataset_scenarios(&mut self, rows: &[DatasetScenarioRow]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO dataset_scenario (run_number, dataset, scenario) VALUES \
                 (?1, ?2, ?3)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![
                i64::from(row.run.get()),
                row.dataset.as_str(),
                row.scenario.as_str()
            ])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_software_versions(&mut self, rows: &[CmsswVersion]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT OR IGNORE INTO software_version (name) VALUES (?1)")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![row.as_str()])
                .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn update_stream_override(&mut self, row: &StreamOverrideRow) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR REPLACE INTO stream_version_override (run_number, stream, \
                 override_version) VALUES (?1, ?2, ?3)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        stmt.execute(params![
            i64::from(row.run.get()),
            row.stream.as_str(),
            row.override_version.as_str()
        ])
        .map_err(|err| StoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn insert_error_datasets(&mut self, rows: &[ErrorDatasetRow]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT OR IGNORE INTO error_dataset (parent, error) VALUES (?1, ?2)")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![row.parent.as_str(), row.error.as_str()])
                .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_reco_configs(&mut self, rows: &[RecoConfigRow]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO reco_config (run_number, dataset, do_reco, cmssw_version, \
                 event_split, write_reco, write_aod, write_dqm, processing_version, write_skims, \
                 global_tag, config_url) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, \
                 ?12)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![
                i64::from(row.run.get()),
                row.dataset.as_str(),
                i64::from(row.do_reco),
                row.cmssw_version.as_str(),
                i64::from(row.event_split),
                i64::from(row.write_reco),
                i64::from(row.write_aod),
                i64::from(row.write_dqm),
                row.processing_version.as_str(),
                row.write_skims.as_deref(),
                row.global_tag.as_str(),
                row.config_url.as_str()
            ])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_storage_nodes(&mut self, rows: &[NodeName]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached("INSERT OR IGNORE INTO storage_node (name) VALUES (?1)")
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![row.as_str()])
                .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_storage_assignments(
        &mut self,
        rows: &[StorageAssignmentRow],
    ) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO storage_assignment (run_number, dataset, node, custodial, \
                 request_only, priority) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![
                i64::from(row.run.get()),
                row.dataset.as_str(),
                row.node.as_str(),
                i64::from(row.custodial),
                request_only_flag(row.request_only),
                row.priority.as_str()
            ])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn insert_skim_configs(&mut self, rows: &[SkimConfigRow]) -> Result<(), StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO skim_config (run_number, dataset, data_tier, skim_name, \
                 node, cmssw_version, two_file_read, processing_version, global_tag, config_url) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .map_err(|err| StoreError::Db(err.to_string()))?;
        for row in rows {
            stmt.execute(params![
                i64::from(row.run.get()),
                row.dataset.as_str(),
                row.data_tier.as_str(),
                row.skim_name.as_str(),
                row.node.as_str(),
                row.cmssw_version.as_str(),
                i64::from(row.two_file_read),
                row.processing_version.as_str(),
                row.global_tag.as_str(),
                row.config_url.as_str()
            ])
            .map_err(|err| StoreError::Db(err.to_string()))?;
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().map_err(|err| StoreError::Db(err.to_string()))
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().map_err(|err| StoreError::Db(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the `"y"`/`"n"` wire flag for the request-only policy.
const fn request_only_flag(request_only: bool) -> &'static str {
    if request_only { "y" } else { "n" }
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS run (
                    run_number INTEGER PRIMARY KEY,
                    trigger_key TEXT,
                    process TEXT,
                    acquisition_era TEXT,
                    reco_timeout_secs INTEGER,
                    reco_lock_timeout_secs INTEGER
                );
                CREATE TABLE IF NOT EXISTS stream (
                    name TEXT PRIMARY KEY
                );
                CREATE TABLE IF NOT EXISTS primary_dataset (
                    name TEXT PRIMARY KEY
                );
                CREATE TABLE IF NOT EXISTS trigger_path (
                    name TEXT PRIMARY KEY
                );
                CREATE TABLE IF NOT EXISTS software_version (
                    name TEXT PRIMARY KEY
                );
                CREATE TABLE IF NOT EXISTS storage_node (
                    name TEXT PRIMARY KEY
                );
                CREATE TABLE IF NOT EXISTS run_stream_dataset (
                    run_number INTEGER NOT NULL,
                    dataset TEXT NOT NULL,
                    stream TEXT NOT NULL,
                    PRIMARY KEY (run_number, dataset, stream)
                );
                CREATE INDEX IF NOT EXISTS idx_run_stream_dataset_stream
                    ON run_stream_dataset (run_number, stream);
                CREATE TABLE IF NOT EXISTS run_dataset_trigger (
                    run_number INTEGER NOT NULL,
                    trigger TEXT NOT NULL,
                    dataset TEXT NOT NULL,
                    PRIMARY KEY (run_number, trigger, dataset)
                );
                CREATE TABLE IF NOT EXISTS run_stream_style (
                    run_number INTEGER NOT NULL,
                    stream TEXT NOT NULL,
                    style TEXT NOT NULL,
                    PRIMARY KEY (run_number, stream)
                );
                CREATE TABLE IF NOT EXISTS repack_config (
                    run_number INTEGER NOT NULL,
                    stream TEXT NOT NULL,
                    processing_version TEXT NOT NULL,
                    PRIMARY KEY (run_number, stream)
                );
                CREATE TABLE IF NOT EXISTS express_config (
                    run_number INTEGER NOT NULL,
                    stream TEXT NOT NULL,
                    processing_version TEXT NOT NULL,
                    write_tiers TEXT NOT NULL,
                    write_skims TEXT,
                    global_tag TEXT NOT NULL,
                    processing_config_url TEXT NOT NULL,
                    alca_merge_config_url TEXT NOT NULL,
                    PRIMARY KEY (run_number, stream)
                );
                CREATE TABLE IF NOT EXISTS special_dataset (
                    stream TEXT NOT NULL,
                    dataset TEXT NOT NULL,
                    PRIMARY KEY (stream, dataset)
                );
                CREATE TABLE IF NOT EXISTS dataset_scenario (
                    run_number INTEGER NOT NULL,
                    dataset TEXT NOT NULL,
                    scenario TEXT NOT NULL,
                    PRIMARY KEY (run_number, dataset)
                );
                CREATE TABLE IF NOT EXISTS stream_version_override (
                    run_number INTEGER NOT NULL,
                    stream TEXT NOT NULL,
                    override_version TEXT NOT NULL,
                    PRIMARY KEY (run_number, stream)
                );
                CREATE TABLE IF NOT EXISTS error_dataset (
                    parent TEXT NOT NULL,
                    error TEXT NOT NULL,
                    PRIMARY KEY (parent, error)
                );
                CREATE TABLE IF NOT EXISTS reco_config (
                    run_number INTEGER NOT NULL,
                    dataset TEXT NOT NULL,
                    do_reco INTEGER NOT NULL,
                    cmssw_version TEXT NOT NULL,
                    event_split INTEGER NOT NULL,
                    write_reco INTEGER NOT NULL,
                    write_aod INTEGER NOT NULL,
                    write_dqm INTEGER NOT NULL,
                    processing_version TEXT NOT NULL,
                    write_skims TEXT,
                    global_tag TEXT NOT NULL,
                    config_url TEXT NOT NULL,
                    PRIMARY KEY (run_number, dataset)
                );
                CREATE TABLE IF NOT EXISTS storage_assignment (
                    run_number INTEGER NOT NULL,
                    dataset TEXT NOT NULL,
                    node TEXT NOT NULL,
                    custodial INTEGER NOT NULL,
                    request_only TEXT NOT NULL,
                    priority TEXT NOT NULL,
                    PRIMARY KEY (run_number, dataset, node)
                );
                CREATE TABLE IF NOT EXISTS skim_config (
                    run_number INTEGER NOT NULL,
                    dataset TEXT NOT NULL,
                    data_tier TEXT NOT NULL,
                    skim_name TEXT NOT NULL,
                    node TEXT NOT NULL,
                    cmssw_version TEXT NOT NULL,
                    two_file_read INTEGER NOT NULL,
                    processing_version TEXT NOT NULL,
                    global_tag TEXT NOT NULL,
                    config_url TEXT NOT NULL,
                    PRIMARY KEY (run_number, dataset, data_tier, skim_name)
                );
                CREATE TABLE IF NOT EXISTS stream_online_version (
                    run_number INTEGER NOT NULL,
                    stream TEXT NOT NULL,
                    online_version TEXT NOT NULL,
                    PRIMARY KEY (run_number, stream)
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}
