//! # Workflow Steps
//!
//! A step is one stage of a case's processing, identified within the case
//! by its 1-based sequence number.
//!
//! ```text
//! PENDING ──activate──▶ IN_PROGRESS ──complete──▶ COMPLETED (terminal)
//!    └────────────────────complete (relaxed order)─────▲
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use olympus_core::{CaseId, StepId, Timestamp, UserRef, ValidationError};

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    /// The step currently being worked on.
    InProgress,
    Completed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(ValidationError::UnknownVariant {
                kind: "step status",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether a step may complete while lower-numbered steps are still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOrderPolicy {
    /// Steps complete in sequence order.
    #[default]
    Strict,
    /// Any open step may complete; the case still closes only when all are done.
    Relaxed,
}

impl FromStr for StepOrderPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "relaxed" => Ok(Self::Relaxed),
            other => Err(ValidationError::UnknownVariant {
                kind: "step order policy",
                value: other.to_string(),
            }),
        }
    }
}

/// One step of a case workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub case_id: CaseId,
    /// 1-based position within the case.
    pub sequence: u32,
    pub title: String,
    pub description: Option<String>,
    pub status: StepStatus,
    /// When the step became the active step.
    pub started_at: Option<Timestamp>,
    /// Set exactly once.
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<UserRef>,
    /// Comment left on completion.
    pub comment: Option<String>,
}

impl Step {
    pub(crate) fn pending(
        case_id: CaseId,
        sequence: u32,
        title: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: StepId::new(),
            case_id,
            sequence,
            title,
            description,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            completed_by: None,
            comment: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    /// PENDING → IN_PROGRESS. Returns false if the step was not pending.
    pub(crate) fn activate(&mut self, now: Timestamp) -> bool {
        if self.status != StepStatus::Pending {
            return false;
        }
        self.status = StepStatus::InProgress;
        self.started_at = Some(now);
        true
    }

    /// Any open status → COMPLETED. Callers check `is_completed` first.
    pub(crate) fn complete(&mut self, now: Timestamp, actor: Option<UserRef>, comment: Option<String>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.status = StepStatus::Completed;
        self.completed_at = Some(now);
        self.completed_by = actor;
        self.comment = comment;
    }
}
