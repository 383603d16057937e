//! # Case File: Step Sequencer
//!
//! A [`CaseFile`] is a case together with its steps and documents: the unit
//! that is loaded, mutated and committed as a whole. All workflow rules that
//! span the case and its steps live here.
//!
//! ## Sequencing rules
//!
//! - Steps are numbered contiguously `1..=n`, `n >= 1`.
//! - Starting the case activates step 1.
//! - Completing step `k` requires the case to be IN_PROGRESS and, under
//!   [`StepOrderPolicy::Strict`], every step below `k` to be COMPLETED.
//! - After a completion the lowest open step becomes IN_PROGRESS.
//! - When every step is COMPLETED the case closes, exactly once.
//!
//! Each successful operation writes its audit entries into the caller's
//! [`AuditRecorder`]. A refused operation mutates nothing and records nothing.

use serde::{Deserialize, Serialize};
use serde_json::json;

use olympus_core::identity::bounded_text;
use olympus_core::{CaseNumber, DocumentId, Timestamp, UserRef, ValidationError};

use crate::audit::{AuditAction, AuditRecorder};
use crate::case::{normalize_optional, Case, CaseStatus, SUBJECT_MAX_LEN};
use crate::document::{Document, DocumentKind, DocumentSignature};
use crate::error::CaseError;
use crate::step::{Step, StepOrderPolicy};
use crate::template::{validate_steps, StepDefinition};

/// Result of a successful step completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCompletion {
    /// The step as completed.
    pub step: Step,
    /// The step that became active as a consequence, if any.
    pub promoted: Option<Step>,
    /// Whether this completion closed the case.
    pub case_closed: bool,
}

impl StepCompletion {
    /// Every step whose stored row must change.
    pub fn changed_steps(&self) -> Vec<Step> {
        let mut out = vec![self.step.clone()];
        out.extend(self.promoted.clone());
        out
    }
}

/// Editable case details. `None` leaves a field unchanged; a blank
/// description clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetailsUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub owner: Option<UserRef>,
}

impl CaseDetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.description.is_none() && self.owner.is_none()
    }
}

/// A case with its steps (ordered by sequence) and documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFile {
    case: Case,
    steps: Vec<Step>,
    documents: Vec<Document>,
}

impl CaseFile {
    /// Create a new OPEN case with one PENDING step per definition.
    pub fn open(
        number: CaseNumber,
        subject: &str,
        description: Option<String>,
        owner: Option<UserRef>,
        definitions: &[StepDefinition],
    ) -> Result<Self, ValidationError> {
        validate_steps(definitions)?;
        let case = Case::new(number, subject, description, owner)?;
        let steps = definitions
            .iter()
            .zip(1u32..)
            .map(|(def, sequence)| {
                Step::pending(
                    case.id,
                    sequence,
                    def.title.trim().to_string(),
                    normalize_optional(def.description.clone()),
                )
            })
            .collect();
        Ok(Self {
            case,
            steps,
            documents: Vec::new(),
        })
    }

    /// Reassemble a case file read from storage. Steps are sorted by sequence.
    pub fn from_parts(case: Case, mut steps: Vec<Step>, documents: Vec<Document>) -> Self {
        steps.sort_by_key(|s| s.sequence);
        Self {
            case,
            steps,
            documents,
        }
    }

    pub fn into_parts(self) -> (Case, Vec<Step>, Vec<Document>) {
        (self.case, self.steps, self.documents)
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    /// Steps in ascending sequence order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, sequence: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.sequence == sequence)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Number of COMPLETED steps.
    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    // ─── Operations ──────────────────────────────────────────────────

    /// OPEN → IN_PROGRESS and activate the first step.
    ///
    /// Returns the steps whose state changed.
    pub fn start(&mut self, audit: &mut AuditRecorder) -> Result<Vec<Step>, CaseError> {
        self.case.start()?;
        audit.record(
            AuditAction::CaseStarted,
            format!("Case {} started", self.case.number),
        );
        Ok(self.promote_next(self.case.updated_at).into_iter().collect())
    }

    /// Complete step `sequence`, then promote the next step and close the
    /// case if nothing is left open.
    pub fn complete_step(
        &mut self,
        sequence: u32,
        comment: Option<String>,
        policy: StepOrderPolicy,
        audit: &mut AuditRecorder,
    ) -> Result<StepCompletion, CaseError> {
        let idx = self
            .steps
            .iter()
            .position(|s| s.sequence == sequence)
            .ok_or(CaseError::StepNotFound { sequence })?;
        if self.steps[idx].is_completed() {
            return Err(CaseError::AlreadyCompleted { sequence });
        }
        self.case
            .require_status(CaseStatus::InProgress, "complete a step of")?;
        if policy == StepOrderPolicy::Strict {
            if let Some(blocking) = self
                .steps
                .iter()
                .find(|s| s.sequence < sequence && !s.is_completed())
            {
                return Err(CaseError::OutOfOrder {
                    sequence,
                    blocking: blocking.sequence,
                });
            }
        }

        let now = Timestamp::now();
        let comment = normalize_optional(comment);
        let step = &mut self.steps[idx];
        step.complete(now, audit.actor().cloned(), comment.clone());
        let completed = step.clone();
        self.case.updated_at = now;
        audit.record_with(
            AuditAction::StepCompleted,
            format!("Step {} '{}' completed", completed.sequence, completed.title),
            json!({
                "step_id": completed.id,
                "sequence": completed.sequence,
                "comment": comment,
            }),
        );

        let promoted = self.promote_next(now);

        let case_closed = self.steps.iter().all(Step::is_completed);
        if case_closed {
            self.case.close()?;
            audit.record(
                AuditAction::CaseClosed,
                format!("Case {} closed: all steps completed", self.case.number),
            );
        }

        Ok(StepCompletion {
            step: completed,
            promoted,
            case_closed,
        })
    }

    /// Change subject, description or owner. Returns `false` (and records
    /// nothing) when every given value equals the current one.
    pub fn update_details(
        &mut self,
        update: CaseDetailsUpdate,
        audit: &mut AuditRecorder,
    ) -> Result<bool, CaseError> {
        if update.is_empty() {
            return Err(ValidationError::Empty { field: "update" }.into());
        }
        self.case.require_not_closed("update")?;

        let subject = update
            .subject
            .map(|s| bounded_text(&s, "subject", SUBJECT_MAX_LEN))
            .transpose()?;

        let mut changed = Vec::new();
        if let Some(subject) = subject {
            if subject != self.case.subject {
                self.case.subject = subject;
                changed.push("subject");
            }
        }
        if let Some(description) = update.description {
            let description = normalize_optional(Some(description));
            if description != self.case.description {
                self.case.description = description;
                changed.push("description");
            }
        }
        if let Some(owner) = update.owner {
            if self.case.owner.as_ref() != Some(&owner) {
                self.case.owner = Some(owner);
                changed.push("owner");
            }
        }
        if changed.is_empty() {
            return Ok(false);
        }

        self.case.updated_at = Timestamp::now();
        audit.record_with(
            AuditAction::CaseUpdated,
            format!("Case {} updated: {}", self.case.number, changed.join(", ")),
            json!({ "fields": changed }),
        );
        Ok(true)
    }

    /// Attach a new document. Content, if given, is hashed and not retained.
    pub fn attach_document(
        &mut self,
        name: &str,
        kind: DocumentKind,
        content: Option<&[u8]>,
        audit: &mut AuditRecorder,
    ) -> Result<Document, CaseError> {
        self.case.require_not_closed("attach a document to")?;
        let document = Document::new(self.case.id, name, kind, content, audit.actor().cloned())?;
        self.case.updated_at = document.uploaded_at;
        audit.record_with(
            AuditAction::DocumentAttached,
            format!("Document '{}' attached", document.name),
            json!({
                "document_id": document.id,
                "kind": document.kind,
                "content_digest": document.content_digest,
                "size_bytes": document.size_bytes,
            }),
        );
        self.documents.push(document.clone());
        Ok(document)
    }

    /// Sign a document of this case. Allowed in any case status.
    pub fn sign_document(
        &mut self,
        id: DocumentId,
        signer: UserRef,
        audit: &mut AuditRecorder,
    ) -> Result<Document, CaseError> {
        let idx = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or(CaseError::DocumentNotFound(id))?;
        if self.documents[idx].is_signed() {
            return Err(CaseError::AlreadySigned(id));
        }

        let signed_at = Timestamp::now();
        let hash = self.documents[idx]
            .signature_hash(&signer, signed_at)
            .map_err(|e| ValidationError::InvalidWorkflow(e.to_string()))?;
        let document = &mut self.documents[idx];
        document.signature = Some(DocumentSignature {
            hash: hash.clone(),
            signer: signer.clone(),
            signed_at,
        });
        let signed = document.clone();
        self.case.updated_at = signed_at;
        audit.record_with(
            AuditAction::DocumentSigned,
            format!("Document '{}' signed by {}", signed.name, signer),
            json!({
                "document_id": signed.id,
                "signature_hash": hash,
                "signer": signer,
            }),
        );
        Ok(signed)
    }

    /// Activate the lowest open step if it is still PENDING.
    fn promote_next(&mut self, now: Timestamp) -> Option<Step> {
        let next = self.steps.iter_mut().find(|s| !s.is_completed())?;
        next.activate(now).then(|| next.clone())
    }
}
