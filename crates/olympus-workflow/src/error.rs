//! Error type of the workflow service.
//!
//! Every refusal keeps its kind through the stack so the HTTP layer can map
//! it to a distinct status. Persistence failures carry the store error for
//! logging; its text is not meant for clients.

use thiserror::Error;

use olympus_core::{DocumentId, ValidationError};
use olympus_state::CaseError;
use olympus_store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The case, step or document does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The case status does not allow the operation.
    #[error("{0}")]
    InvalidTransition(String),

    #[error("step {sequence} is already completed")]
    AlreadyCompleted { sequence: u32 },

    #[error("step {sequence} cannot complete before step {blocking}")]
    OutOfOrder { sequence: u32, blocking: u32 },

    #[error("document {0} is already signed")]
    AlreadySigned(DocumentId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl From<CaseError> for WorkflowError {
    fn from(e: CaseError) -> Self {
        match e {
            CaseError::InvalidTransition { .. } => Self::InvalidTransition(e.to_string()),
            CaseError::StepNotFound { sequence } => Self::NotFound(format!("step {sequence}")),
            CaseError::AlreadyCompleted { sequence } => Self::AlreadyCompleted { sequence },
            CaseError::OutOfOrder { sequence, blocking } => Self::OutOfOrder { sequence, blocking },
            CaseError::DocumentNotFound(id) => Self::NotFound(format!("document {id}")),
            CaseError::AlreadySigned(id) => Self::AlreadySigned(id),
            CaseError::Validation(v) => Self::Validation(v.to_string()),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CaseNotFound(id) => Self::NotFound(format!("case {id}")),
            StoreError::DocumentNotFound(id) => Self::NotFound(format!("document {id}")),
            StoreError::Duplicate(what) => Self::Duplicate(what),
            other => Self::Persistence(other),
        }
    }
}

impl From<ValidationError> for WorkflowError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}
