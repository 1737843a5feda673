//! HAUS Calculator Server
//!
//! Provides the HTTP API over the loan affordability core.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, record_calculation, record_request, record_validation_failure};
pub use state::{AppState, MarketContext};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use haus_config::ConfigError;
use haus_core::{PolicyViolation, ValidationError};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Policy(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for the response body
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Validation(e) => e.code(),
            ServerError::Policy(e) => e.code(),
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Config(_) => "config_error",
            ServerError::NotFound(_) => "not_found",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            ServerError::Validation(_) | ServerError::Policy(_) => {
                record_validation_failure(self.code());
            }
            ServerError::Config(e) => tracing::error!(error = %e, "Configuration error"),
            ServerError::Internal(message) => tracing::error!(%message, "Internal error"),
            ServerError::InvalidRequest(_) | ServerError::NotFound(_) => {}
        }

        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ServerError::from(ValidationError::InvalidLoanTerm(2.5));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_loan_term");

        let err = ServerError::from(PolicyViolation::TermNotOffered {
            value: 15.0,
            allowed: vec![25, 30],
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ServerError::Config(ConfigError::FileNotFound("x".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_message_keeps_value() {
        let err = ServerError::from(ValidationError::InvalidPropertyPrice(-5.0));
        assert!(err.to_string().contains("-5"));
    }
}
