//! # Mutation Guard
//!
//! Policy evaluated before dispatch that may refuse mutating requests.
//! The production gate disables `POST`, `PUT` and `DELETE` when the process
//! runs in production and the request comes from the designated client.

use axum::http::{HeaderMap, Method};
use tracing::warn;

use crate::config::ProductionConfig;

use super::errors::{ApiError, ApiResult};

/// Pre-dispatch check for mutating requests
pub trait MutationGuard: Send + Sync {
    fn check(&self, method: &Method, headers: &HeaderMap) -> ApiResult<()>;
}

/// Whether `method` changes stored state
pub fn is_mutation(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::DELETE)
}

/// Guard that never refuses
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenGuard;

impl MutationGuard for OpenGuard {
    fn check(&self, _method: &Method, _headers: &HeaderMap) -> ApiResult<()> {
        Ok(())
    }
}

/// Disables mutations for the designated client in production
#[derive(Debug, Clone)]
pub struct ProductionGate {
    production: bool,
    header: String,
    header_value: String,
}

impl ProductionGate {
    pub fn new(production: bool, header: impl Into<String>, header_value: impl Into<String>) -> Self {
        Self {
            production,
            header: header.into(),
            header_value: header_value.into(),
        }
    }

    /// Build the gate, reading the environment marker from the process
    pub fn from_env(config: &ProductionConfig) -> Self {
        let production = std::env::var(&config.env_var)
            .map(|value| value == config.env_value)
            .unwrap_or(false);
        Self::new(production, &config.header, &config.header_value)
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    fn applies_to(&self, headers: &HeaderMap) -> bool {
        self.production
            && headers
                .get(self.header.as_str())
                .and_then(|v| v.to_str().ok())
                .map_or(false, |v| v == self.header_value)
    }
}

impl MutationGuard for ProductionGate {
    fn check(&self, method: &Method, headers: &HeaderMap) -> ApiResult<()> {
        if is_mutation(method) && self.applies_to(headers) {
            warn!(method = %method, "mutation refused by production gate");
            return Err(ApiError::Forbidden(method.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn client_headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-client", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_open_guard_allows_everything() {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            assert!(OpenGuard.check(&method, &client_headers("web")).is_ok());
        }
    }

    #[test]
    fn test_gate_blocks_mutations_in_production() {
        let gate = ProductionGate::new(true, "x-client", "web");
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let err = gate.check(&method, &client_headers("web")).unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)));
        }
    }

    #[test]
    fn test_gate_allows_reads_in_production() {
        let gate = ProductionGate::new(true, "x-client", "web");
        assert!(gate.check(&Method::GET, &client_headers("web")).is_ok());
        assert!(gate.check(&Method::OPTIONS, &client_headers("web")).is_ok());
    }

    #[test]
    fn test_gate_requires_both_conditions() {
        let outside = ProductionGate::new(false, "x-client", "web");
        assert!(outside.check(&Method::POST, &client_headers("web")).is_ok());

        let gate = ProductionGate::new(true, "x-client", "web");
        assert!(gate.check(&Method::POST, &client_headers("cli")).is_ok());
        assert!(gate.check(&Method::POST, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_from_env_reads_marker() {
        let config = ProductionConfig {
            env_var: "JSONSTORE_TEST_GATE_MARKER".to_string(),
            ..Default::default()
        };
        std::env::remove_var(&config.env_var);
        assert!(!ProductionGate::from_env(&config).is_production());

        std::env::set_var(&config.env_var, "production");
        assert!(ProductionGate::from_env(&config).is_production());
        std::env::remove_var(&config.env_var);
    }
}
