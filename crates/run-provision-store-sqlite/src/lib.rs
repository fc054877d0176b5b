// crates/run-provision-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Provision Store
// Description: Durable ProvisionStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for run provisioning rows.
// Dependencies: run-provision-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ProvisionStore`] implementation.
//! Every named operation maps to one relational table whose primary key is
//! the operation's uniqueness key, and insert operations use
//! `INSERT OR IGNORE`, so re-submitting identical binds is a no-op. All
//! mutations of one provisioning call run inside one `rusqlite` transaction
//! with explicit commit and rollback.
//!
//! [`ProvisionStore`]: run_provision_core::ProvisionStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteProvisionStore;
pub use store::SqliteProvisionTx;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
