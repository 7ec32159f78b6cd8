//! # Request Routing
//!
//! Turns a method and path into exactly one record operation. The path
//! prefix and query string are stripped, the rest is split on `/` with empty
//! segments dropped, and the first segment (if any) is the record id.

use axum::http::Method;

use super::errors::{ApiError, ApiResult};

/// A resolved record operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List,
    Get(String),
    Create,
    Update(String),
    Delete(String),
}

impl Operation {
    /// Pick the operation for `method` given the id extracted from the path
    pub fn resolve(method: &Method, id: Option<&str>) -> ApiResult<Self> {
        let id = id.map(str::to_string);
        match *method {
            Method::GET => Ok(id.map_or(Operation::List, Operation::Get)),
            // an id in the path is ignored on create
            Method::POST => Ok(Operation::Create),
            Method::PUT => id.map(Operation::Update).ok_or_else(ApiError::id_required),
            Method::DELETE => id.map(Operation::Delete).ok_or_else(ApiError::id_required),
            _ => Err(ApiError::MethodNotAllowed(method.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get(_) => "get",
            Operation::Create => "create",
            Operation::Update(_) => "update",
            Operation::Delete(_) => "delete",
        }
    }
}

/// Extract the record id from a request path
pub fn record_id<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    // the prefix only counts when it ends on a segment boundary
    let rest = path
        .strip_prefix(prefix.trim_end_matches('/'))
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(path);
    rest.split('/').find(|segment| !segment.is_empty())
}
