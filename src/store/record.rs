//! # Records
//!
//! The stored entity and its list summary, plus the raw row forms both
//! backends decode into before conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clock::parse_timestamp;
use super::errors::{StoreError, StoreResult};

/// A stored JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record without its payload, as returned by list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row as read from storage, all columns still text
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: String,
    pub data: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RawRecord {
    /// Decode the stored text back into a record
    ///
    /// Data that no longer parses as JSON is reported as corruption rather
    /// than passed through as a string.
    pub fn decode(self) -> StoreResult<Record> {
        let data = serde_json::from_str(&self.data)
            .map_err(|e| StoreError::corrupt(&self.id, format!("data: {}", e)))?;
        let created_at = decode_timestamp(&self.id, "created_at", &self.created_at)?;
        let updated_at = decode_timestamp(&self.id, "updated_at", &self.updated_at)?;
        Ok(Record {
            id: self.id,
            data,
            created_at,
            updated_at,
        })
    }
}

/// Summary row as read from storage
#[derive(Debug, Clone)]
pub struct RawSummary {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RawSummary {
    pub fn decode(self) -> StoreResult<RecordSummary> {
        let created_at = decode_timestamp(&self.id, "created_at", &self.created_at)?;
        let updated_at = decode_timestamp(&self.id, "updated_at", &self.updated_at)?;
        Ok(RecordSummary {
            id: self.id,
            created_at,
            updated_at,
        })
    }
}

fn decode_timestamp(id: &str, column: &str, text: &str) -> StoreResult<DateTime<Utc>> {
    parse_timestamp(text).map_err(|e| StoreError::corrupt(id, format!("{}: {}", column, e)))
}
