use async_trait::async_trait;

use olympus_core::{CaseId, DocumentId};
use olympus_state::{
    AuditEntry, AuditRecorder, Case, CaseFile, CaseStatus, Document, PendingAuditEntry, Step,
};

use crate::error::StoreError;

/// Default page size for case listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Maximum page size for case listings.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One atomic change to a case file.
///
/// The case row is written only if the stored version equals
/// `expected_version`; the changed steps, upserted documents and audit
/// entries are written in the same unit or not at all.
#[derive(Debug, Clone)]
pub struct CaseCommit {
    /// The case as it must be stored, with `version = expected_version + 1`.
    pub case: Case,
    pub expected_version: i64,
    pub steps: Vec<Step>,
    pub documents: Vec<Document>,
    pub audit: Vec<PendingAuditEntry>,
}

impl CaseCommit {
    /// Prepare a commit of `case` and the entries buffered in `audit`.
    /// Bumps the case version.
    pub fn new(mut case: Case, audit: AuditRecorder) -> Self {
        let expected_version = case.version;
        case.version += 1;
        Self {
            case,
            expected_version,
            steps: Vec::new(),
            documents: Vec::new(),
            audit: audit.into_pending(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }

    pub fn case_id(&self) -> CaseId {
        self.case.id
    }
}

/// Case listing filter and page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseQuery {
    pub status: Option<CaseStatus>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for CaseQuery {
    fn default() -> Self {
        Self {
            status: None,
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of cases, newest first, with the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePage {
    pub items: Vec<Case>,
    pub total: u64,
}

/// Persistence port for case files.
///
/// ## Atomicity
///
/// [`commit`](CaseStore::commit) applies the case update, step updates,
/// document upserts and audit appends as one unit. On any error nothing of
/// the commit is visible to later reads.
///
/// ## Audit sequencing
///
/// The store assigns each appended entry the next per-case sequence number,
/// starting at 1, in the order the entries appear in the commit.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to live in axum
/// application state and cross task boundaries.
#[async_trait]
pub trait CaseStore: Send + Sync + 'static {
    /// Persist a freshly opened case file.
    ///
    /// Returns `Duplicate` if the id or case number already exists.
    async fn insert_case(&self, file: &CaseFile) -> Result<(), StoreError>;

    /// Load a case with its steps and documents.
    async fn load_case(&self, id: CaseId) -> Result<CaseFile, StoreError>;

    async fn list_cases(&self, query: CaseQuery) -> Result<CasePage, StoreError>;

    /// Apply a version-checked commit. Returns the audit entries as stored.
    async fn commit(&self, commit: CaseCommit) -> Result<Vec<AuditEntry>, StoreError>;

    /// Audit trail of a case, ordered by sequence.
    async fn history(&self, id: CaseId) -> Result<Vec<AuditEntry>, StoreError>;

    /// The case a document belongs to.
    async fn find_document(&self, id: DocumentId) -> Result<CaseId, StoreError>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}
