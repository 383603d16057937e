//! # Case Service
//!
//! The library interface to case workflows. Each state-changing operation:
//!
//! 1. takes the per-case lock,
//! 2. loads the case file from the store,
//! 3. applies the rule in `olympus-state`, buffering audit entries,
//! 4. commits case, changed rows and audit entries in one version-checked
//!    store commit,
//!
//! and releases the lock on every exit path. A refused operation never
//! reaches the store. A failed commit leaves the stored case untouched and
//! can be retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use olympus_core::{CaseId, CaseNumber, DocumentId, UserRef};
use olympus_state::{
    AuditEntry, AuditRecorder, Case, CaseDetailsUpdate, CaseError, CaseFile, Document,
    DocumentKind, Step, StepDefinition, StepOrderPolicy,
};
use olympus_store::{CaseCommit, CasePage, CaseQuery, CaseStore, StoreError};

use crate::error::WorkflowError;
use crate::locks::CaseLocks;
use crate::templates::TemplateCatalog;

/// Where the steps of a new case come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// A template from the catalog, by name.
    Template(String),
    /// An explicit list of step definitions.
    Steps(Vec<StepDefinition>),
}

/// Input for [`CaseService::create_case`].
#[derive(Debug, Clone)]
pub struct NewCase {
    pub number: CaseNumber,
    pub subject: String,
    pub description: Option<String>,
    pub owner: Option<UserRef>,
    pub workflow: StepSource,
}

/// Input for [`CaseService::attach_document`].
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub kind: DocumentKind,
    /// Raw content; hashed, not retained.
    pub content: Option<Vec<u8>>,
}

/// Case workflow operations over an injected [`CaseStore`].
pub struct CaseService {
    store: Arc<dyn CaseStore>,
    templates: TemplateCatalog,
    policy: StepOrderPolicy,
    locks: CaseLocks,
}

impl std::fmt::Debug for CaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseService")
            .field("templates", &self.templates.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CaseService {
    pub fn new(
        store: Arc<dyn CaseStore>,
        templates: TemplateCatalog,
        policy: StepOrderPolicy,
    ) -> Self {
        Self {
            store,
            templates,
            policy,
            locks: CaseLocks::default(),
        }
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn step_order_policy(&self) -> StepOrderPolicy {
        self.policy
    }

    // ─── Queries ─────────────────────────────────────────────────────

    pub async fn get_case(&self, case_id: CaseId) -> Result<Case, WorkflowError> {
        Ok(self.store.load_case(case_id).await?.case().clone())
    }

    /// The case with its steps and documents.
    pub async fn get_case_file(&self, case_id: CaseId) -> Result<CaseFile, WorkflowError> {
        Ok(self.store.load_case(case_id).await?)
    }

    pub async fn list_cases(&self, query: CaseQuery) -> Result<CasePage, WorkflowError> {
        Ok(self.store.list_cases(query).await?)
    }

    /// Steps ordered by sequence.
    pub async fn list_steps(&self, case_id: CaseId) -> Result<Vec<Step>, WorkflowError> {
        Ok(self.store.load_case(case_id).await?.steps().to_vec())
    }

    /// Audit trail ordered by sequence.
    pub async fn get_history(&self, case_id: CaseId) -> Result<Vec<AuditEntry>, WorkflowError> {
        Ok(self.store.history(case_id).await?)
    }

    pub async fn list_documents(&self, case_id: CaseId) -> Result<Vec<Document>, WorkflowError> {
        Ok(self.store.load_case(case_id).await?.documents().to_vec())
    }

    pub async fn ping(&self) -> Result<(), WorkflowError> {
        Ok(self.store.ping().await?)
    }

    // ─── Commands ────────────────────────────────────────────────────

    /// Open a new case with all of its steps PENDING. Records no audit entry.
    pub async fn create_case(&self, new: NewCase) -> Result<CaseFile, WorkflowError> {
        let steps = match new.workflow {
            StepSource::Template(name) => self
                .templates
                .get(&name)
                .ok_or_else(|| WorkflowError::Validation(format!("unknown workflow template {name:?}")))?
                .steps
                .clone(),
            StepSource::Steps(steps) => steps,
        };
        let file = CaseFile::open(
            new.number,
            &new.subject,
            new.description,
            new.owner,
            &steps,
        )?;
        self.store.insert_case(&file).await.map_err(|e| {
            log_store_failure(&e, file.case().id, "create_case");
            WorkflowError::from(e)
        })?;
        tracing::info!(
            case_id = %file.case().id,
            number = %file.case().number,
            steps = file.steps().len(),
            "Case created"
        );
        Ok(file)
    }

    /// OPEN → IN_PROGRESS; activates step 1.
    pub async fn start_case(
        &self,
        case_id: CaseId,
        actor: Option<UserRef>,
    ) -> Result<Case, WorkflowError> {
        let _guard = self.locks.acquire(case_id).await;
        let mut file = self.store.load_case(case_id).await?;
        let mut audit = AuditRecorder::new(case_id, actor);
        let changed = file
            .start(&mut audit)
            .map_err(|e| refused(e, case_id, "start_case"))?;

        let commit = CaseCommit::new(file.case().clone(), audit).with_steps(changed);
        let case = self.persist(commit, "start_case").await?;
        tracing::info!(case_id = %case_id, action = "case_started", "Case started");
        Ok(case)
    }

    /// Complete step `sequence`. Completing the last open step closes the case.
    pub async fn complete_step(
        &self,
        case_id: CaseId,
        sequence: u32,
        comment: Option<String>,
        actor: Option<UserRef>,
    ) -> Result<Step, WorkflowError> {
        let _guard = self.locks.acquire(case_id).await;
        let mut file = self.store.load_case(case_id).await?;
        let mut audit = AuditRecorder::new(case_id, actor);
        let done = file
            .complete_step(sequence, comment, self.policy, &mut audit)
            .map_err(|e| refused(e, case_id, "complete_step"))?;

        let commit =
            CaseCommit::new(file.case().clone(), audit).with_steps(done.changed_steps());
        self.persist(commit, "complete_step").await?;
        tracing::info!(case_id = %case_id, step = sequence, action = "step_completed", "Step completed");
        if done.case_closed {
            tracing::info!(case_id = %case_id, action = "case_closed", "Case closed");
        }
        Ok(done.step)
    }

    /// Edit subject, description or owner. A no-op update commits nothing.
    pub async fn update_case(
        &self,
        case_id: CaseId,
        update: CaseDetailsUpdate,
        actor: Option<UserRef>,
    ) -> Result<Case, WorkflowError> {
        let _guard = self.locks.acquire(case_id).await;
        let mut file = self.store.load_case(case_id).await?;
        let mut audit = AuditRecorder::new(case_id, actor);
        let changed = file
            .update_details(update, &mut audit)
            .map_err(|e| refused(e, case_id, "update_case"))?;
        if !changed {
            return Ok(file.case().clone());
        }

        let case = self
            .persist(CaseCommit::new(file.case().clone(), audit), "update_case")
            .await?;
        tracing::info!(case_id = %case_id, action = "case_updated", "Case details updated");
        Ok(case)
    }

    pub async fn attach_document(
        &self,
        case_id: CaseId,
        new: NewDocument,
        actor: Option<UserRef>,
    ) -> Result<Document, WorkflowError> {
        let _guard = self.locks.acquire(case_id).await;
        let mut file = self.store.load_case(case_id).await?;
        let mut audit = AuditRecorder::new(case_id, actor);
        let document = file
            .attach_document(&new.name, new.kind, new.content.as_deref(), &mut audit)
            .map_err(|e| refused(e, case_id, "attach_document"))?;

        let commit = CaseCommit::new(file.case().clone(), audit).with_document(document.clone());
        self.persist(commit, "attach_document").await?;
        tracing::info!(
            case_id = %case_id,
            document_id = %document.id,
            action = "document_attached",
            "Document attached"
        );
        Ok(document)
    }

    /// Sign a document. `signer` is also the audit actor.
    pub async fn sign_document(
        &self,
        document_id: DocumentId,
        signer: UserRef,
    ) -> Result<Document, WorkflowError> {
        let case_id = self.store.find_document(document_id).await?;
        let _guard = self.locks.acquire(case_id).await;
        let mut file = self.store.load_case(case_id).await?;
        let mut audit = AuditRecorder::new(case_id, Some(signer.clone()));
        let signed = file
            .sign_document(document_id, signer, &mut audit)
            .map_err(|e| refused(e, case_id, "sign_document"))?;

        let commit = CaseCommit::new(file.case().clone(), audit).with_document(signed.clone());
        self.persist(commit, "sign_document").await?;
        tracing::info!(
            case_id = %case_id,
            document_id = %document_id,
            action = "document_signed",
            "Document signed"
        );
        Ok(signed)
    }

    async fn persist(&self, commit: CaseCommit, operation: &'static str) -> Result<Case, WorkflowError> {
        let case = commit.case.clone();
        self.store.commit(commit).await.map_err(|e| {
            log_store_failure(&e, case.id, operation);
            WorkflowError::from(e)
        })?;
        Ok(case)
    }
}

fn refused(e: CaseError, case_id: CaseId, operation: &'static str) -> WorkflowError {
    tracing::debug!(case_id = %case_id, operation, error = %e, "Operation refused");
    e.into()
}

fn log_store_failure(e: &StoreError, case_id: CaseId, operation: &'static str) {
    match e {
        StoreError::ConcurrentConflict { .. } | StoreError::Duplicate(_) => {
            tracing::warn!(case_id = %case_id, operation, error = %e, "Commit rejected");
        }
        StoreError::CaseNotFound(_) | StoreError::DocumentNotFound(_) => {}
        _ => {
            tracing::error!(case_id = %case_id, operation, error = %e, "Persistence failure");
        }
    }
}
