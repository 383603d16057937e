//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs, helpers to extract and
//! validate JSON bodies and query strings in handlers, and the [`Actor`]
//! extractor for the acting user.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::Json;

use olympus_core::UserRef;

use crate::error::AppError;

/// Header carrying the acting user's reference.
pub const ACTOR_HEADER: &str = "x-olympus-user";

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract a JSON body whose fields are all optional.
///
/// A request sent without a body or `Content-Type` yields `T::default()`.
/// A body that is present must still parse.
pub fn extract_optional_json<T: Validate + Default>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = match result {
        Err(JsonRejection::MissingJsonContentType(_)) => T::default(),
        other => extract_json(other)?,
    };
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract and validate query parameters.
pub fn extract_validated_query<T: Validate>(
    result: Result<Query<T>, QueryRejection>,
) -> Result<T, AppError> {
    let Query(value) = result.map_err(|err| AppError::BadRequest(err.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// The acting user, taken from the `x-olympus-user` header when present.
///
/// Recorded on completed steps and on audit entries. Absent means the
/// operation is unattributed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor(pub Option<UserRef>);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(Self(None));
        };
        let raw = value
            .to_str()
            .map_err(|_| AppError::Validation(format!("{ACTOR_HEADER} must be valid UTF-8")))?;
        Ok(Self(Some(UserRef::new(raw)?)))
    }
}
