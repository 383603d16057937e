//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in the case-management domain.
//! These prevent accidental identifier confusion: a `DocumentId` cannot be
//! passed where a `CaseId` is expected.
//!
//! UUID-backed identifiers are opaque and generated here. `CaseNumber` is the
//! human-readable, externally assigned reference (e.g. `EXP-2026-001`), and
//! `UserRef` is a weak reference to a user managed by the identity provider.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum length of a case number.
pub const CASE_NUMBER_MAX_LEN: usize = 50;

/// Maximum length of a user reference.
pub const USER_REF_MAX_LEN: usize = 255;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID (e.g. a database primary key).
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a case file (expediente).
    CaseId,
    "case"
);

uuid_id!(
    /// Unique identifier for one step of a case workflow.
    StepId,
    "step"
);

uuid_id!(
    /// Unique identifier for a document attached to a case.
    DocumentId,
    "document"
);

uuid_id!(
    /// Unique identifier for an audit trail entry.
    AuditEntryId,
    "audit entry"
);

/// Human-readable case number, unique across the system.
///
/// Trimmed on construction; must be non-empty and at most
/// [`CASE_NUMBER_MAX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseNumber(String);

impl CaseNumber {
    /// Validate and wrap a case number.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        bounded_text(s.as_ref(), "case number", CASE_NUMBER_MAX_LEN).map(Self)
    }

    /// The case number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CaseNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CaseNumber> for String {
    fn from(value: CaseNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Weak reference to a user of the identity provider.
///
/// Only used for lookup and attribution; the core never owns users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserRef(String);

impl UserRef {
    /// Validate and wrap a user reference.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        bounded_text(s.as_ref(), "user reference", USER_REF_MAX_LEN).map(Self)
    }

    /// The user reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserRef> for String {
    fn from(value: UserRef) -> Self {
        value.0
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim `s` and check it is non-empty and within `max` characters.
pub fn bounded_text(s: &str, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let len = trimmed.chars().count();
    if len > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: len,
        });
    }
    Ok(trimmed.to_string())
}
