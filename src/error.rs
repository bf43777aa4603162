//! Error taxonomy module
//!
//! This module defines the EngineError type shared across the engine,
//! with a mapping from each variant to an HTTP status for the web layer.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Errors produced by the scheduling engine and its adapters
///
/// Variants follow the propagation policy of the engine: per-item upstream
/// failures are recorded and skipped inside a pass, while whole-pass failures
/// surface to the HTTP caller with a generic message (details go to the log).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or invalid required configuration (fatal at startup)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad webhook signature or missing session
    #[error("unauthorized: {0}")]
    Auth(String),

    /// Malformed identifiers or missing body fields
    #[error("invalid request: {0}")]
    Validation(String),

    /// Installation, project, or item not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation requires the Pro plan
    #[error("this operation requires the Pro plan")]
    PlanGate,

    /// Upstream project-service call failed or timed out
    #[error("upstream API error: {0}")]
    Upstream(String),

    /// Dropped or deferred work; never surfaced to callers
    #[error("transient: {0}")]
    Transient(String),

    /// Anything else; surfaced as a generic 500
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Auth(_) => StatusCode::UNAUTHORIZED,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::PlanGate => StatusCode::FORBIDDEN,
            EngineError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Configuration(_)
            | EngineError::Upstream(_)
            | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            EngineError::PlanGate => json!({
                "success": false,
                "error": self.to_string(),
                "upgrade": true,
            }),
            // Internal details stay in the log
            EngineError::Internal(_) | EngineError::Upstream(_) => json!({
                "success": false,
                "error": "internal server error",
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            EngineError::Auth("no session".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            EngineError::Validation("bad id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EngineError::NotFound("installation 7".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(EngineError::PlanGate.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            EngineError::Upstream("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_details_not_leaked() {
        let resp = EngineError::Upstream("token=secret123".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
