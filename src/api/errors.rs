use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::db::models::Severity;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No data provided")]
    NoData,

    #[error("Missing fields: {0:?}")]
    MissingFields(Vec<&'static str>),

    #[error("{0}")]
    InvalidFormat(&'static str),

    #[error("Severity must be one of {:?}", Severity::NAMES)]
    InvalidSeverity(String),

    /// Store or other unexpected failure. Details are logged, never returned.
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(e) => {
                error!(error = %format!("{e:#}"), "Error processing request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvalidSeverity(value) => {
                warn!(severity = %value, "Invalid severity value");
                StatusCode::BAD_REQUEST
            }
            other => {
                warn!(error = %other, "Rejected request");
                StatusCode::BAD_REQUEST
            }
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}
