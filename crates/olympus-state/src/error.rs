//! Errors raised by case, step and document operations.

use thiserror::Error;

use olympus_core::{DocumentId, ValidationError};

use crate::case::CaseStatus;

/// A case file operation was refused. Nothing was mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaseError {
    /// The case status does not allow the operation.
    #[error("cannot {operation} a case in status {status}")]
    InvalidTransition {
        /// Current case status.
        status: CaseStatus,
        /// Attempted operation.
        operation: &'static str,
    },

    /// No step with this sequence number.
    #[error("step {sequence} does not exist")]
    StepNotFound { sequence: u32 },

    #[error("step {sequence} is already completed")]
    AlreadyCompleted { sequence: u32 },

    /// A lower-numbered step is still open.
    #[error("step {sequence} cannot complete before step {blocking}")]
    OutOfOrder { sequence: u32, blocking: u32 },

    #[error("document {0} does not exist")]
    DocumentNotFound(DocumentId),

    #[error("document {0} is already signed")]
    AlreadySigned(DocumentId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
