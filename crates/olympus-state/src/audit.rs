//! # Audit Trail
//!
//! Every state-changing operation on a case appends one or more
//! [`AuditEntry`] records. Operations write into an [`AuditRecorder`]; the
//! recorder's pending entries are persisted by the store in the same commit
//! as the state change, and the store assigns the per-case `sequence`.
//!
//! Entries are append-only. There is no API to amend or remove one.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use olympus_core::{AuditEntryId, CaseId, Timestamp, UserRef, ValidationError};

/// What happened to the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CaseStarted,
    StepCompleted,
    CaseClosed,
    DocumentAttached,
    DocumentSigned,
    CaseUpdated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseStarted => "case_started",
            Self::StepCompleted => "step_completed",
            Self::CaseClosed => "case_closed",
            Self::DocumentAttached => "document_attached",
            Self::DocumentSigned => "document_signed",
            Self::CaseUpdated => "case_updated",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "case_started" => Ok(Self::CaseStarted),
            "step_completed" => Ok(Self::StepCompleted),
            "case_closed" => Ok(Self::CaseClosed),
            "document_attached" => Ok(Self::DocumentAttached),
            "document_signed" => Ok(Self::DocumentSigned),
            "case_updated" => Ok(Self::CaseUpdated),
            other => Err(ValidationError::UnknownVariant {
                kind: "audit action",
                value: other.to_string(),
            }),
        }
    }
}

/// An entry recorded by an operation, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAuditEntry {
    pub id: AuditEntryId,
    pub action: AuditAction,
    pub description: String,
    pub actor: Option<UserRef>,
    /// Always a JSON object.
    pub metadata: Value,
    pub recorded_at: Timestamp,
}

impl PendingAuditEntry {
    /// Fix the entry at its position in the case history.
    pub fn into_entry(self, case_id: CaseId, sequence: i64) -> AuditEntry {
        AuditEntry {
            id: self.id,
            case_id,
            sequence,
            action: self.action,
            description: self.description,
            actor: self.actor,
            metadata: self.metadata,
            recorded_at: self.recorded_at,
        }
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub case_id: CaseId,
    /// 1-based append position within the case. Authoritative order.
    pub sequence: i64,
    pub action: AuditAction,
    pub description: String,
    pub actor: Option<UserRef>,
    pub metadata: Value,
    pub recorded_at: Timestamp,
}

/// Collects the audit entries of one operation on one case.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    case_id: CaseId,
    actor: Option<UserRef>,
    pending: Vec<PendingAuditEntry>,
}

impl AuditRecorder {
    /// Start recording for `case_id`, attributing entries to `actor`.
    pub fn new(case_id: CaseId, actor: Option<UserRef>) -> Self {
        Self {
            case_id,
            actor,
            pending: Vec::new(),
        }
    }

    pub fn case_id(&self) -> CaseId {
        self.case_id
    }

    pub fn actor(&self) -> Option<&UserRef> {
        self.actor.as_ref()
    }

    /// Buffer an entry with empty metadata.
    pub fn record(&mut self, action: AuditAction, description: impl Into<String>) {
        self.record_with(action, description, Value::Object(Default::default()));
    }

    /// Buffer an entry with metadata. Non-object metadata is wrapped as `{"value": ..}`.
    pub fn record_with(&mut self, action: AuditAction, description: impl Into<String>, metadata: Value) {
        let metadata = match metadata {
            Value::Object(_) => metadata,
            other => serde_json::json!({ "value": other }),
        };
        self.pending.push(PendingAuditEntry {
            id: AuditEntryId::new(),
            action,
            description: description.into(),
            actor: self.actor.clone(),
            metadata,
            recorded_at: Timestamp::now(),
        });
    }

    pub fn pending(&self) -> &[PendingAuditEntry] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn into_pending(self) -> Vec<PendingAuditEntry> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_roundtrip() {
        for a in [
            AuditAction::CaseStarted,
            AuditAction::StepCompleted,
            AuditAction::CaseClosed,
            AuditAction::DocumentAttached,
            AuditAction::DocumentSigned,
            AuditAction::CaseUpdated,
        ] {
            assert_eq!(a.as_str().parse::<AuditAction>().unwrap(), a);
            assert_eq!(serde_json::to_value(a).unwrap(), Value::from(a.as_str()));
        }
    }

    #[test]
    fn recorder_attributes_actor_and_keeps_order() {
        let case_id = CaseId::new();
        let actor = UserRef::new("tramitador-3").unwrap();
        let mut rec = AuditRecorder::new(case_id, Some(actor.clone()));
        rec.record(AuditAction::StepCompleted, "Step 3 completed");
        rec.record(AuditAction::CaseClosed, "Case closed");
        let pending = rec.into_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].action, AuditAction::StepCompleted);
        assert_eq!(pending[1].action, AuditAction::CaseClosed);
        assert!(pending.iter().all(|e| e.actor.as_ref() == Some(&actor)));
    }

    #[test]
    fn scalar_metadata_is_wrapped() {
        let mut rec = AuditRecorder::new(CaseId::new(), None);
        rec.record_with(AuditAction::CaseUpdated, "x", Value::from(7));
        assert_eq!(rec.pending()[0].metadata, serde_json::json!({"value": 7}));
    }

    #[test]
    fn into_entry_assigns_position() {
        let case_id = CaseId::new();
        let mut rec = AuditRecorder::new(case_id, None);
        rec.record(AuditAction::CaseStarted, "started");
        let entry = rec.into_pending().remove(0).into_entry(case_id, 1);
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.case_id, case_id);
    }
}
