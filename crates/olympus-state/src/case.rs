//! # Case Lifecycle State Machine
//!
//! ```text
//! OPEN ──start──▶ IN_PROGRESS ──close──▶ CLOSED (terminal)
//! ```
//!
//! Status only moves forward. `close` is crate-private: a case closes when
//! the sequencer completes its last step, never on request.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use olympus_core::identity::bounded_text;
use olympus_core::{CaseId, CaseNumber, Timestamp, UserRef, ValidationError};

use crate::error::CaseError;

/// Maximum length of a case subject.
pub const SUBJECT_MAX_LEN: usize = 2000;

// ─── Case Status ─────────────────────────────────────────────────────

/// Lifecycle status of a case. Ordered: `Open < InProgress < Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    /// Created, work not started.
    Open,
    /// Started; steps are being completed.
    InProgress,
    /// Every step completed (terminal).
    Closed,
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "CLOSED" => Ok(Self::Closed),
            other => Err(ValidationError::UnknownVariant {
                kind: "case status",
                value: other.to_string(),
            }),
        }
    }
}

// ─── Case ────────────────────────────────────────────────────────────

/// A case file (expediente).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub number: CaseNumber,
    pub subject: String,
    pub description: Option<String>,
    pub status: CaseStatus,
    pub owner: Option<UserRef>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Set once, when the case closes.
    pub closed_at: Option<Timestamp>,
    /// Optimistic-concurrency counter; bumped on every commit.
    pub version: i64,
}

impl Case {
    /// Build a new OPEN case at version 0.
    pub fn new(
        number: CaseNumber,
        subject: &str,
        description: Option<String>,
        owner: Option<UserRef>,
    ) -> Result<Self, ValidationError> {
        let now = Timestamp::now();
        Ok(Self {
            id: CaseId::new(),
            number,
            subject: bounded_text(subject, "subject", SUBJECT_MAX_LEN)?,
            description: normalize_optional(description),
            status: CaseStatus::Open,
            owner,
            created_at: now,
            updated_at: now,
            closed_at: None,
            version: 0,
        })
    }

    /// OPEN → IN_PROGRESS.
    pub fn start(&mut self) -> Result<(), CaseError> {
        self.require_status(CaseStatus::Open, "start")?;
        self.status = CaseStatus::InProgress;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// IN_PROGRESS → CLOSED. Stamps `closed_at`.
    pub(crate) fn close(&mut self) -> Result<(), CaseError> {
        self.require_status(CaseStatus::InProgress, "close")?;
        let now = Timestamp::now();
        self.status = CaseStatus::Closed;
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn require_status(
        &self,
        expected: CaseStatus,
        operation: &'static str,
    ) -> Result<(), CaseError> {
        if self.status != expected {
            return Err(CaseError::InvalidTransition {
                status: self.status,
                operation,
            });
        }
        Ok(())
    }

    pub(crate) fn require_not_closed(&self, operation: &'static str) -> Result<(), CaseError> {
        if self.is_closed() {
            return Err(CaseError::InvalidTransition {
                status: self.status,
                operation,
            });
        }
        Ok(())
    }
}

/// Trim optional free text; blank becomes `None`.
pub(crate) fn normalize_optional(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_case() -> Case {
        Case::new(
            CaseNumber::new("EXP-001").unwrap(),
            "Licencia de obra menor",
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn new_case_is_open_at_version_zero() {
        let case = make_case();
        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(case.version, 0);
        assert!(case.closed_at.is_none());
    }

    #[test]
    fn blank_subject_is_rejected() {
        let err = Case::new(CaseNumber::new("EXP-2").unwrap(), "  ", None, None).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "subject" });
    }

    #[test]
    fn start_then_close() {
        let mut case = make_case();
        case.start().unwrap();
        assert_eq!(case.status, CaseStatus::InProgress);
        case.close().unwrap();
        assert_eq!(case.status, CaseStatus::Closed);
        assert!(case.closed_at.is_some());
    }

    #[test]
    fn start_twice_is_invalid() {
        let mut case = make_case();
        case.start().unwrap();
        let err = case.start().unwrap_err();
        assert!(matches!(
            err,
            CaseError::InvalidTransition {
                status: CaseStatus::InProgress,
                operation: "start"
            }
        ));
    }

    #[test]
    fn close_from_open_is_invalid() {
        let mut case = make_case();
        assert!(case.close().is_err());
        assert_eq!(case.status, CaseStatus::Open);
    }

    #[test]
    fn closed_case_cannot_restart() {
        let mut case = make_case();
        case.start().unwrap();
        case.close().unwrap();
        let closed_at = case.closed_at;
        assert!(case.start().is_err());
        assert!(case.close().is_err());
        assert_eq!(case.closed_at, closed_at);
    }

    #[test]
    fn status_ordering_is_lifecycle_order() {
        assert!(CaseStatus::Open < CaseStatus::InProgress);
        assert!(CaseStatus::InProgress < CaseStatus::Closed);
    }

    #[test]
    fn status_parses_display_form() {
        for s in [CaseStatus::Open, CaseStatus::InProgress, CaseStatus::Closed] {
            assert_eq!(s.to_string().parse::<CaseStatus>().unwrap(), s);
        }
        assert!("ABIERTO".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&CaseStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }
}
