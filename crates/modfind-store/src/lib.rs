//! Postgres persistence for modfind.
//!
//! `Store` owns the write paths (module upsert, search projections, the
//! imported-by sweep) and the read paths the resolver and planner build
//! on. All SQL goes through the [`db`] adapter; every multi-statement
//! write happens inside a single transaction.

pub mod db;
pub mod error;

mod excluded;
mod imported_by;
mod insert_module;
mod latest;
mod search_documents;
mod unit;
mod version_map;

pub use db::{Db, Isolation, SqlValue, bulk_insert};
pub use error::{Result, StoreError};
pub use search_documents::SearchDocumentArgs;
pub use unit::ModuleVersionInfo;

use dashmap::DashMap;
use modfind_core::LatestModuleVersions;

/// Status code the external fetcher records for module versions that
/// duplicate a canonical module under an alternative path.
pub const DEFAULT_ALTERNATIVE_STATUS: i32 = 491;

/// The store: one shared handle over the pool plus process-wide caches.
pub struct Store {
    db: Db,
    latest_cache: DashMap<String, LatestModuleVersions>,
    alternative_status: i32,
}

impl Store {
    pub fn new(db: Db) -> Self {
        Self::with_alternative_status(db, DEFAULT_ALTERNATIVE_STATUS)
    }

    /// The alternative-path status code is a fetcher convention, not
    /// ours, so it stays configurable.
    pub fn with_alternative_status(db: Db, alternative_status: i32) -> Self {
        Self {
            db,
            latest_cache: DashMap::new(),
            alternative_status,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}
