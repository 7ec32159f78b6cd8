//! # Record Operations
//!
//! The five record operations over a [`RecordStore`]. Body validation and
//! the not-found policy live here; the store only runs SQL.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::store::{generate_id, Record, RecordStore, RecordSummary};

use super::errors::{ApiError, ApiResult};

/// Record operations bound to one store
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All records without data, most recently updated first
    ///
    /// An empty store yields an empty list, not a not-found error.
    pub async fn list(&self) -> ApiResult<Vec<RecordSummary>> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Record> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    pub async fn create(&self, body: &[u8]) -> ApiResult<Record> {
        let data = serialize_data(body)?;
        let id = generate_id();
        let now = self.store.clock().now();

        self.store.insert(&id, &data, now).await?;
        debug!(id = %id, "record created");
        self.get(&id).await
    }

    pub async fn update(&self, id: &str, body: &[u8]) -> ApiResult<Record> {
        let data = serialize_data(body)?;
        if !self.store.exists(id).await? {
            return Err(ApiError::NotFound(id.to_string()));
        }
        let now = self.store.clock().now();

        self.store.update(id, &data, now).await?;
        debug!(id = %id, "record updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        if self.store.delete(id).await? == 0 {
            return Err(ApiError::NotFound(id.to_string()));
        }
        debug!(id = %id, "record deleted");
        Ok(())
    }
}

/// Validate a create/update body and return its `data` as JSON text
///
/// The body must be a JSON object with a top-level `data` key. The value
/// itself may be anything, including `null`.
pub fn serialize_data(body: &[u8]) -> ApiResult<String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
    let data = value
        .as_object()
        .and_then(|obj| obj.get("data"))
        .ok_or_else(|| ApiError::bad_request("Missing \"data\" field"))?;
    serde_json::to_string(data)
        .map_err(|e| ApiError::bad_request(format!("Invalid data: {}", e)))
}
