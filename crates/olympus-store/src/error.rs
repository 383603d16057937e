use olympus_core::{CaseId, DocumentId};

/// All errors that can be returned by a [`crate::CaseStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("case {0} not found")]
    CaseNotFound(CaseId),

    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),

    /// A uniqueness constraint was violated (case id or case number).
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// Optimistic concurrency conflict: the stored case is no longer at the
    /// version the commit was prepared against.
    #[error("concurrent conflict on case {case_id}: expected version {expected_version}")]
    ConcurrentConflict {
        case_id: CaseId,
        expected_version: i64,
    },

    /// The backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A backend-specific storage error (query failure, corrupt row, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
