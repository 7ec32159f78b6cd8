//! # Record Store
//!
//! The persistence gateway: a single `records` table keyed by id, reached
//! through the [`RecordStore`] trait. Two backends implement it:
//!
//! - [`SqliteStore`] - embedded SQLite file (or in-memory database)
//! - [`RemoteStore`] - libSQL-compatible remote database over HTTP
//!
//! Both store `data` as serialized JSON text and timestamps as fixed-width
//! RFC 3339 text, and both share the SQL in [`sql`].

pub mod clock;
pub mod errors;
pub mod id;
pub mod record;
pub mod remote;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use clock::MonotonicClock;
pub use errors::{StoreError, StoreResult};
pub use id::generate_id;
pub use record::{Record, RecordSummary};
pub use remote::RemoteStore;
pub use sqlite::SqliteStore;

/// Storage operations behind the record API
///
/// Implementations only translate calls to SQL. Validation and the
/// not-found policy live in the REST layer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the records table if missing and seed the clock from it
    async fn init_schema(&self) -> StoreResult<()>;

    /// All records without data, most recently updated first
    async fn list(&self) -> StoreResult<Vec<RecordSummary>>;

    /// A single record, if present
    async fn get(&self, id: &str) -> StoreResult<Option<Record>>;

    /// Whether a row with this id exists
    async fn exists(&self, id: &str) -> StoreResult<bool>;

    /// Insert a new row with both timestamps set to `at`
    async fn insert(&self, id: &str, data: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Replace data and `updated_at`; returns affected rows
    async fn update(&self, id: &str, data: &str, at: DateTime<Utc>) -> StoreResult<u64>;

    /// Delete a row; returns affected rows
    async fn delete(&self, id: &str) -> StoreResult<u64>;

    /// Timestamp source for writes to this store
    fn clock(&self) -> &MonotonicClock;
}

/// Statements shared by both backends
pub mod sql {
    pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS records (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z'),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')
    )";

    pub const CREATE_INDEX: &str =
        "CREATE INDEX IF NOT EXISTS records_updated_at ON records (updated_at)";

    pub const LATEST: &str = "SELECT MAX(updated_at) FROM records";

    pub const LIST: &str =
        "SELECT id, created_at, updated_at FROM records ORDER BY updated_at DESC, id DESC";

    pub const GET: &str = "SELECT id, data, created_at, updated_at FROM records WHERE id = ?1";

    pub const EXISTS: &str = "SELECT 1 FROM records WHERE id = ?1";

    pub const INSERT: &str =
        "INSERT INTO records (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)";

    pub const UPDATE: &str = "UPDATE records SET data = ?2, updated_at = ?3 WHERE id = ?1";

    pub const DELETE: &str = "DELETE FROM records WHERE id = ?1";
}
