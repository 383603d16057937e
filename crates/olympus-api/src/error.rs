//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`WorkflowError`] kinds to HTTP status codes with a JSON body
//! `{"error": {"code", "message"}}`. Persistence details are logged
//! server-side and never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use olympus_store::StoreError;
use olympus_workflow::WorkflowError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "OUT_OF_ORDER").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Case, step or document not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Case status does not allow the operation (409).
    #[error("{0}")]
    InvalidTransition(String),

    /// Step already completed (409).
    #[error("{0}")]
    AlreadyCompleted(String),

    /// An earlier step is still open (409).
    #[error("{0}")]
    OutOfOrder(String),

    /// Document already signed (409).
    #[error("{0}")]
    AlreadySigned(String),

    /// Case number already taken (409).
    #[error("{0}")]
    Duplicate(String),

    /// Lost an optimistic concurrency race with another writer (409).
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The case store cannot be reached (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::AlreadyCompleted(_) => (StatusCode::CONFLICT, "ALREADY_COMPLETED"),
            Self::OutOfOrder(_) => (StatusCode::CONFLICT, "OUT_OF_ORDER"),
            Self::AlreadySigned(_) => (StatusCode::CONFLICT, "ALREADY_SIGNED"),
            Self::Duplicate(_) => (StatusCode::CONFLICT, "DUPLICATE"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose store error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::ServiceUnavailable(_) => "The case store is temporarily unavailable".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotFound(_) => Self::NotFound(err.to_string()),
            WorkflowError::InvalidTransition(msg) => Self::InvalidTransition(msg),
            WorkflowError::AlreadyCompleted { .. } => Self::AlreadyCompleted(err.to_string()),
            WorkflowError::OutOfOrder { .. } => Self::OutOfOrder(err.to_string()),
            WorkflowError::AlreadySigned(_) => Self::AlreadySigned(err.to_string()),
            WorkflowError::Validation(msg) => Self::Validation(msg),
            WorkflowError::Duplicate(_) => Self::Duplicate(err.to_string()),
            WorkflowError::Persistence(store) => match store {
                StoreError::ConcurrentConflict { case_id, .. } => Self::Conflict(format!(
                    "case {case_id} was modified concurrently; retry the request"
                )),
                StoreError::Unavailable(msg) => Self::ServiceUnavailable(msg),
                other => Self::Internal(other.to_string()),
            },
        }
    }
}

impl From<olympus_core::ValidationError> for AppError {
    fn from(err: olympus_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use olympus_core::{CaseId, DocumentId};

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn workflow_conflicts_get_distinct_codes() {
        let cases = [
            (
                WorkflowError::InvalidTransition("cannot start".into()),
                "INVALID_TRANSITION",
            ),
            (
                WorkflowError::AlreadyCompleted { sequence: 2 },
                "ALREADY_COMPLETED",
            ),
            (
                WorkflowError::OutOfOrder {
                    sequence: 3,
                    blocking: 1,
                },
                "OUT_OF_ORDER",
            ),
            (
                WorkflowError::AlreadySigned(DocumentId::new()),
                "ALREADY_SIGNED",
            ),
            (WorkflowError::Duplicate("case number EXP-1".into()), "DUPLICATE"),
        ];
        for (err, expected) in cases {
            let (status, code) = AppError::from(err).status_and_code();
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(code, expected);
        }
    }

    #[test]
    fn not_found_and_validation_statuses() {
        let (status, _) = AppError::from(WorkflowError::NotFound("case x".into())).status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, code) =
            AppError::from(WorkflowError::Validation("subject must not be empty".into()))
                .status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "VALIDATION_ERROR");
    }

    #[test]
    fn persistence_failures_split_by_cause() {
        let unavailable =
            AppError::from(WorkflowError::Persistence(StoreError::Unavailable("pool".into())));
        assert_eq!(unavailable.status_and_code().0, StatusCode::SERVICE_UNAVAILABLE);

        let backend =
            AppError::from(WorkflowError::Persistence(StoreError::Backend("syntax".into())));
        assert_eq!(backend.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);

        let raced = AppError::from(WorkflowError::Persistence(StoreError::ConcurrentConflict {
            case_id: CaseId::new(),
            expected_version: 3,
        }));
        assert_eq!(raced.status_and_code(), (StatusCode::CONFLICT, "CONFLICT"));
    }

    #[tokio::test]
    async fn unparseable_body_is_400() {
        let (status, body) = response_parts(AppError::BadRequest("EOF while parsing".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "BAD_REQUEST");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("relation cases does not exist".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn unavailable_hides_details() {
        let (status, body) =
            response_parts(AppError::ServiceUnavailable("pool timed out".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.error.message.contains("pool"));
    }

    #[tokio::test]
    async fn out_of_order_message_names_blocking_step() {
        let err = AppError::from(WorkflowError::OutOfOrder {
            sequence: 3,
            blocking: 1,
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error.code, "OUT_OF_ORDER");
        assert!(body.error.message.contains("step 1"), "{}", body.error.message);
    }

    #[test]
    fn error_body_skips_empty_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message: "case x not found".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("details"));
    }
}
