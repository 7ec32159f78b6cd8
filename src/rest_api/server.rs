//! # REST API HTTP Server
//!
//! A single catch-all handler that routes by method and path rather than
//! by axum path patterns, so that the prefix, trailing segments and the
//! "id required" errors behave exactly as the record API defines them.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use tracing::debug;

use super::errors::{ApiError, ApiResult};
use super::guard::MutationGuard;
use super::handler::RecordService;
use super::route::{record_id, Operation};

/// Shared state for the record API
pub struct ApiState {
    pub service: RecordService,
    pub guard: Arc<dyn MutationGuard>,
    pub path_prefix: String,
}

impl ApiState {
    pub fn new(
        service: RecordService,
        guard: Arc<dyn MutationGuard>,
        path_prefix: impl Into<String>,
    ) -> Self {
        Self {
            service,
            guard,
            path_prefix: path_prefix.into(),
        }
    }
}

/// Router answering every path not claimed by another route
pub fn records_router(state: Arc<ApiState>) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(
    State(state): State<Arc<ApiState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // preflight answers before any routing
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };

    match handle(&state, &method, uri.path(), &headers, &body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle(
    state: &ApiState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<Response> {
    state.guard.check(method, headers)?;

    let op = Operation::resolve(method, record_id(path, &state.path_prefix))?;
    debug!(operation = op.name(), path, "dispatching record request");

    let service = &state.service;
    let response = match op {
        Operation::List => Json(service.list().await?).into_response(),
        Operation::Get(id) => Json(service.get(&id).await?).into_response(),
        Operation::Create => Json(service.create(body).await?).into_response(),
        Operation::Update(id) => Json(service.update(&id, body).await?).into_response(),
        Operation::Delete(id) => {
            service.delete(&id).await?;
            StatusCode::NO_CONTENT.into_response()
        }
    };
    Ok(response)
}
