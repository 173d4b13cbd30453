//! API error type
//!
//! Every handler returns `Result<_, ApiError>`; the status code for each kind
//! is decided here and nowhere else.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::convert::ConvertError;
use crate::printing::PrintError;
use crate::storage::StoreError;

/// Message for a missing conversion tool, shared by print and preview
pub const CONVERTER_MISSING_MESSAGE: &str = "File conversion utility not found on server.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Bad client input
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// Print service could not be reached
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Conversion tool is not installed
    #[error("{0}")]
    ToolMissing(String),
    #[error("{0}")]
    ConversionFailed(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_)
            | ApiError::ToolMissing(_)
            | ApiError::ConversionFailed(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::NotFound(m)
            | ApiError::ServiceUnavailable(m)
            | ApiError::ToolMissing(m)
            | ApiError::ConversionFailed(m)
            | ApiError::Internal(m) => m,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Map a conversion failure; `failed_message` is used for everything but a missing tool
    pub fn conversion(err: ConvertError, failed_message: &str) -> Self {
        match err {
            ConvertError::ToolMissing { program } => {
                tracing::error!(
                    "{} not found. Ensure it is installed and on PATH.",
                    program
                );
                ApiError::ToolMissing(CONVERTER_MISSING_MESSAGE.to_string())
            }
            other => {
                tracing::error!("Conversion failed: {}", other);
                ApiError::ConversionFailed(failed_message.to_string())
            }
        }
    }

    /// Map a print service failure with call-site specific messages
    pub fn print_service(err: PrintError, unavailable_message: &str, other_message: &str) -> Self {
        match err {
            PrintError::Unavailable(detail) => {
                tracing::error!("CUPS connection failed: {}", detail);
                ApiError::ServiceUnavailable(unavailable_message.to_string())
            }
            PrintError::PrinterNotFound(name) => {
                ApiError::NotFound(format!("Printer '{}' not found.", name))
            }
            PrintError::InvalidRequest(message) => ApiError::Validation(message),
            other => {
                tracing::error!("Print service error: {}", other);
                ApiError::Internal(other_message.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("File store error: {}", err);
        ApiError::Internal("Failed to store uploaded file.".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("Request failed ({}): {}", status, self.message());
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.message());
        }

        let body = ErrorResponse {
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        for err in [
            ApiError::ServiceUnavailable("x".into()),
            ApiError::ToolMissing("x".into()),
            ApiError::ConversionFailed("x".into()),
            ApiError::Internal("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_conversion_mapping() {
        let missing = ApiError::conversion(
            ConvertError::ToolMissing {
                program: "libreoffice".into(),
            },
            "Failed to convert document to PDF.",
        );
        assert_eq!(missing, ApiError::ToolMissing(CONVERTER_MISSING_MESSAGE.into()));

        let failed = ApiError::conversion(
            ConvertError::Failed {
                code: Some(1),
                stderr: String::new(),
            },
            "Failed to convert document to PDF.",
        );
        assert_eq!(
            failed,
            ApiError::ConversionFailed("Failed to convert document to PDF.".into())
        );

        let timed_out = ApiError::conversion(
            ConvertError::TimedOut {
                after: Duration::from_secs(1),
            },
            "nope",
        );
        assert!(matches!(timed_out, ApiError::ConversionFailed(_)));
    }

    #[test]
    fn test_print_service_mapping() {
        let err = ApiError::print_service(PrintError::Unavailable("refused".into()), "down", "other");
        assert_eq!(err, ApiError::ServiceUnavailable("down".into()));

        let err = ApiError::print_service(PrintError::PrinterNotFound("Lab".into()), "down", "other");
        assert_eq!(err, ApiError::NotFound("Printer 'Lab' not found.".into()));

        let err = ApiError::print_service(PrintError::Protocol("bad".into()), "down", "other");
        assert_eq!(err, ApiError::Internal("other".into()));

        let err = ApiError::print_service(
            PrintError::InvalidRequest("too long".into()),
            "down",
            "other",
        );
        assert_eq!(err, ApiError::Validation("too long".into()));
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ApiError::validation("No file part").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No file part");
    }
}
