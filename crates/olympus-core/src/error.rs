//! # Error Types: Boundary Validation
//!
//! Errors raised while turning untrusted input (HTTP payloads, CLI arguments,
//! template files, database rows) into domain values. State machine errors
//! live next to their state machines in `olympus-state`.

use thiserror::Error;

/// Input rejected while constructing a domain value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters (got {actual})")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum accepted length.
        max: usize,
        /// Length of the rejected value.
        actual: usize,
    },

    /// An identifier could not be parsed.
    #[error("invalid {kind} identifier {value:?}")]
    InvalidId {
        /// Identifier namespace ("case", "step", ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A timestamp string was malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An enumerated value was not one of the accepted labels.
    #[error("unknown {kind} {value:?}")]
    UnknownVariant {
        /// Enumeration name ("case status", "document kind", ...).
        kind: &'static str,
        /// The rejected label.
        value: String,
    },

    /// A workflow definition is structurally invalid.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
