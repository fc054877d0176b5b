// crates/run-provision-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Store Unit Tests
// Description: Schema lifecycle, end-to-end provisioning, idempotence, and
//              rollback atomicity against the durable store.
// Purpose: Validate the SQLite ProvisionStore against the provisioning
//          runtime and raw SQL state.
// ============================================================================

//! Unit tests for the `SQLite` provision store:
//! - Schema initialization, reopen, and version mismatch rejection
//! - Path safety checks
//! - End-to-end run and run/stream provisioning
//! - Idempotent re-provisioning (no duplicate rows)
//! - Transaction rollback on mid-write failure

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

use std::path::Path;
use std::path::PathBuf;

use run_provision_config::sample_config;
use run_provision_core::CmsswVersion;
use run_provision_core::DatasetName;
use run_provision_core::LOCAL_RUN_ERA;
use run_provision_core::LOCAL_RUN_PROCESS;
use run_provision_core::ProvisionError;
use run_provision_core::ProvisionStore;
use run_provision_core::RunNumber;
use run_provision_core::StoreError;
use run_provision_core::StreamName;
use run_provision_core::TriggerConfig;
use run_provision_core::TriggerConfigError;
use run_provision_core::TriggerConfigSource;
use run_provision_core::TriggerKey;
use run_provision_core::TriggerPath;
use run_provision_core::runtime::Provisioner;
use run_provision_store_sqlite::SqliteProvisionStore;
use run_provision_store_sqlite::SqliteStoreConfig;
use run_provision_store_sqlite::SqliteStoreError;
use rusqlite::Connection;
use rusqlite::params;
use tempfile::TempDir;

// ============================================================================
// SECTION: Test Fixtures
// ============================================================================

struct StaticTriggerSource {
    snapshot: Option<TriggerConfig>,
}

impl TriggerConfigSource for StaticTriggerSource {
    fn fetch(&self, _key: &TriggerKey) -> Result<Option<TriggerConfig>, TriggerConfigError> {
        Ok(self.snapshot.clone())
    }
}

fn run_number(raw: u32) -> RunNumber {
    RunNumber::from_raw(raw).expect("non-zero run number")
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("provision.db")
}

fn open_store(path: PathBuf) -> SqliteProvisionStore {
    SqliteProvisionStore::new(SqliteStoreConfig::for_path(path)).expect("open sqlite store")
}

fn raw_connection(path: &Path) -> Connection {
    Connection::open(path).expect("open raw connection")
}

fn count_rows(connection: &Connection, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(1) FROM {table}");
    connection
        .query_row(&sql, params![], |row| row.get(0))
        .expect("count rows")
}

fn sample_snapshot() -> TriggerConfig {
    let mut snapshot = TriggerConfig::new("HLT");
    snapshot.insert_dataset(
        StreamName::new("A"),
        DatasetName::new("MinimumBias"),
        vec![TriggerPath::new("HLT_MinBias"), TriggerPath::new("HLT_ZeroBias")],
    );
    snapshot.insert_dataset(
        StreamName::new("Express"),
        DatasetName::new("ExpressPhysics"),
        vec![TriggerPath::new("HLT_ZeroBias")],
    );
    snapshot
}

/// Opens a store with one registered central run and returns the provisioner.
fn central_provisioner(
    path: PathBuf,
    run: RunNumber,
) -> Provisioner<SqliteProvisionStore, StaticTriggerSource> {
    let mut store = open_store(path);
    store
        .register_run(run, Some(&TriggerKey::new("/cdaq/physics/v1")))
        .expect("register run");
    Provisioner::new(
        store,
        StaticTriggerSource {
            snapshot: Some(sample_snapshot()),
        },
    )
}

// ============================================================================
// SECTION: Schema Lifecycle
// ============================================================================

#[test]
fn schema_initializes_and_reopens() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    drop(open_store(path.clone()));
    // Reopening an initialized store validates the recorded version.
    let store = open_store(path.clone());
    store.readiness().expect("readiness probe");
    assert_eq!(store.config().path, path);
    drop(store);

    let connection = raw_connection(&path);
    let version: i64 = connection
        .query_row("SELECT version FROM store_meta", params![], |row| row.get(0))
        .expect("schema version");
    assert_eq!(version, 1);
}

#[test]
fn unsupported_schema_version_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    drop(open_store(path.clone()));

    let connection = raw_connection(&path);
    connection
        .execute("UPDATE store_meta SET version = 99", params![])
        .expect("bump schema version");
    drop(connection);

    let err = SqliteProvisionStore::new(SqliteStoreConfig::for_path(path))
        .expect_err("version mismatch must fail");
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let err = SqliteProvisionStore::new(SqliteStoreConfig::for_path(dir.path().to_path_buf()))
        .expect_err("directory path must fail");
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

// ============================================================================
// SECTION: Run Provisioning
// ============================================================================

#[test]
fn central_run_round_trips_through_sqlite() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    let run = run_number(200_500);
    let mut provisioner = central_provisioner(path.clone(), run);
    let config = sample_config();

    provisioner.configure_run(&config, run, None).expect("configure run");

    let store = provisioner.store();
    assert_eq!(
        store.trigger_key(run).expect("trigger key lookup"),
        Some(TriggerKey::new("/cdaq/physics/v1"))
    );
    assert_eq!(
        store
            .stream_datasets(run, &StreamName::new("A"))
            .expect("stream datasets lookup"),
        vec![DatasetName::new("MinimumBias")]
    );

    let connection = raw_connection(&path);
    let (process, era): (String, String) = connection
        .query_row(
            "SELECT process, acquisition_era FROM run WHERE run_number = ?1",
            params![i64::from(run.get())],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("run metadata");
    assert_eq!(process, "HLT");
    assert_eq!(era, "Commissioning2026");
    assert_eq!(count_rows(&connection, "run_stream_dataset"), 2);
    assert_eq!(count_rows(&connection, "run_dataset_trigger"), 3);
    // HLT_ZeroBias feeds two datasets but registers once.
    assert_eq!(count_rows(&connection, "trigger_path"), 2);
}

#[test]
fn local_run_writes_placeholder_metadata_only() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    let run = run_number(200_501);
    let mut store = open_store(path.clone());
    store.register_run(run, None).expect("register local run");
    let mut provisioner = Provisioner::new(store, StaticTriggerSource { snapshot: None });

    provisioner.configure_run(&sample_config(), run, None).expect("configure local run");

    let connection = raw_connection(&path);
    let (process, era): (String, String) = connection
        .query_row(
            "SELECT process, acquisition_era FROM run WHERE run_number = ?1",
            params![i64::from(run.get())],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("run metadata");
    assert_eq!(process, LOCAL_RUN_PROCESS);
    assert_eq!(era, LOCAL_RUN_ERA);
    assert_eq!(count_rows(&connection, "run_stream_dataset"), 0);
    assert_eq!(count_rows(&connection, "run_dataset_trigger"), 0);
}

#[test]
fn unregistered_run_fails_closed() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(store_path(&dir));
    let mut provisioner = Provisioner::new(store, StaticTriggerSource { snapshot: None });

    let err = provisioner
        .configure_run(&sample_config(), run_number(200_502), None)
        .expect_err("unknown run must fail");
    assert!(matches!(err, ProvisionError::Store(StoreError::Invalid(_))));
}

// ============================================================================
// SECTION: Run/Stream Provisioning
// ============================================================================

#[test]
fn run_stream_round_trips_through_sqlite() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    let run = run_number(200_503);
    let mut provisioner = central_provisioner(path.clone(), run);
    let config = sample_config();

    provisioner.configure_run(&config, run, None).expect("configure run");

    let stream = StreamName::new("A");
    provisioner
        .store_mut()
        .set_online_version(run, &stream, &CmsswVersion::new("CMSSW_14_0_0"))
        .expect("seed online version");
    provisioner
        .configure_run_stream(&config, run, &stream)
        .expect("configure run stream");

    let connection = raw_connection(&path);
    let style: String = connection
        .query_row(
            "SELECT style FROM run_stream_style WHERE run_number = ?1 AND stream = ?2",
            params![i64::from(run.get()), "A"],
            |row| row.get(0),
        )
        .expect("stream style");
    assert_eq!(style, "Bulk");

    // Real and error dataset share one policy row each.
    assert_eq!(count_rows(&connection, "reco_config"), 2);
    let (do_reco, error_do_reco): (i64, i64) = {
        let real: i64 = connection
            .query_row(
                "SELECT do_reco FROM reco_config WHERE run_number = ?1 AND dataset = ?2",
                params![i64::from(run.get()), "MinimumBias"],
                |row| row.get(0),
            )
            .expect("reco row");
        let error: i64 = connection
            .query_row(
                "SELECT do_reco FROM reco_config WHERE run_number = ?1 AND dataset = ?2",
                params![i64::from(run.get()), "MinimumBias-Error"],
                |row| row.get(0),
            )
            .expect("error reco row");
        (real, error)
    };
    assert_eq!(do_reco, 1);
    assert_eq!(error_do_reco, 0);

    // Custodial copy auto-approves in the sample config.
    let request_only: String = connection
        .query_row(
            "SELECT request_only FROM storage_assignment WHERE run_number = ?1 AND dataset = ?2 \
             AND node = ?3",
            params![i64::from(run.get()), "MinimumBias", "T1_US_FNAL"],
            |row| row.get(0),
        )
        .expect("custodial assignment");
    assert_eq!(request_only, "n");

    // The nodeless skim falls back to the custodial node.
    let skim_node: String = connection
        .query_row(
            "SELECT node FROM skim_config WHERE run_number = ?1 AND dataset = ?2",
            params![i64::from(run.get()), "MinimumBias"],
            |row| row.get(0),
        )
        .expect("skim row");
    assert_eq!(skim_node, "T1_US_FNAL");

    // The observed online version maps to an override.
    let override_version: String = connection
        .query_row(
            "SELECT override_version FROM stream_version_override WHERE run_number = ?1 AND \
             stream = ?2",
            params![i64::from(run.get()), "A"],
            |row| row.get(0),
        )
        .expect("override row");
    assert_eq!(override_version, "CMSSW_14_0_1");
}

#[test]
fn reprovisioning_creates_no_duplicate_rows() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    let run = run_number(200_504);
    let mut provisioner = central_provisioner(path.clone(), run);
    let config = sample_config();
    let stream = StreamName::new("A");

    provisioner.configure_run(&config, run, None).expect("first configure run");
    provisioner
        .configure_run_stream(&config, run, &stream)
        .expect("first configure run stream");

    let connection = raw_connection(&path);
    let tables = [
        "run_stream_dataset",
        "run_dataset_trigger",
        "run_stream_style",
        "repack_config",
        "dataset_scenario",
        "error_dataset",
        "reco_config",
        "storage_assignment",
        "skim_config",
        "software_version",
        "storage_node",
    ];
    let before: Vec<i64> =
        tables.iter().map(|table| count_rows(&connection, table)).collect();

    provisioner.configure_run(&config, run, None).expect("second configure run");
    provisioner
        .configure_run_stream(&config, run, &stream)
        .expect("second configure run stream");

    let after: Vec<i64> =
        tables.iter().map(|table| count_rows(&connection, table)).collect();
    assert_eq!(after, before);
}

#[test]
fn mid_write_failure_rolls_the_whole_call_back() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    let run = run_number(200_505);
    let mut provisioner = central_provisioner(path.clone(), run);
    let config = sample_config();

    provisioner.configure_run(&config, run, None).expect("configure run");

    // Sabotage the last table written by the stream call; every earlier
    // write of that call must roll back with it.
    let connection = raw_connection(&path);
    connection.execute("DROP TABLE skim_config", params![]).expect("drop skim table");

    let err = provisioner
        .configure_run_stream(&config, run, &StreamName::new("A"))
        .expect_err("skim insert must fail");
    assert!(matches!(err, ProvisionError::Store(StoreError::Db(_))));

    assert_eq!(count_rows(&connection, "run_stream_style"), 0);
    assert_eq!(count_rows(&connection, "reco_config"), 0);
    assert_eq!(count_rows(&connection, "error_dataset"), 0);
    assert_eq!(count_rows(&connection, "storage_assignment"), 0);
}
