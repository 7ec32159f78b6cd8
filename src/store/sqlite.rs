//! # SQLite Store
//!
//! Embedded backend. One long-lived connection is opened at startup and
//! serialised behind a mutex; every statement autocommits.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use tracing::debug;

use super::clock::{format_timestamp, parse_timestamp, MonotonicClock};
use super::errors::{StoreError, StoreResult};
use super::record::{RawRecord, RawSummary, Record, RecordSummary};
use super::{sql, RecordStore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed record store
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    clock: MonotonicClock,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // journal_mode answers with the resulting mode, so it has to be queried
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        debug!(path = %path.display(), journal_mode = %mode, "opened sqlite store");

        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: MonotonicClock::new(),
        }
    }

    /// Run `f` against the locked connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn init_schema(&self) -> StoreResult<()> {
        let latest: Option<String> = self
            .with_conn(|conn| {
                conn.execute(sql::CREATE_TABLE, [])?;
                conn.execute(sql::CREATE_INDEX, [])?;
                let latest = conn.query_row(sql::LATEST, [], |row| row.get(0))?;
                Ok(latest)
            })
            .await?;

        if let Some(text) = latest {
            let at = parse_timestamp(&text).map_err(|e| StoreError::corrupt("*", e))?;
            self.clock.observe(at);
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<RecordSummary>> {
        let rows = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare_cached(sql::LIST)?;
                let rows = stmt.query_map([], |row| {
                    Ok(RawSummary {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                })?;
                let rows = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(RawSummary::decode).collect()
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Record>> {
        let id = id.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(sql::GET, params![id], |row| {
                        Ok(RawRecord {
                            id: row.get(0)?,
                            data: row.get(1)?,
                            created_at: row.get(2)?,
                            updated_at: row.get(3)?,
                        })
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;
        row.map(RawRecord::decode).transpose()
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(sql::EXISTS, params![id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn insert(&self, id: &str, data: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let (id, data, at) = (id.to_string(), data.to_string(), format_timestamp(&at));
        self.with_conn(move |conn| {
            conn.execute(sql::INSERT, params![id, data, at])?;
            Ok(())
        })
        .await
    }

    async fn update(&self, id: &str, data: &str, at: DateTime<Utc>) -> StoreResult<u64> {
        let (id, data, at) = (id.to_string(), data.to_string(), format_timestamp(&at));
        self.with_conn(move |conn| {
            let affected = conn.execute(sql::UPDATE, params![id, data, at])?;
            Ok(affected as u64)
        })
        .await
    }

    async fn delete(&self, id: &str) -> StoreResult<u64> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let affected = conn.execute(sql::DELETE, params![id])?;
            Ok(affected as u64)
        })
        .await
    }

    fn clock(&self) -> &MonotonicClock {
        &self.clock
    }
}
