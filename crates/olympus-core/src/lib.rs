//! # olympus-core: Foundational Types for Olympus
//!
//! The leaf of the workspace dependency graph. Defines the primitives every
//! other crate builds on: typed identifiers, UTC timestamps, canonical byte
//! production and SHA-256 digests, and the validation error raised when
//! untrusted input is turned into a domain value.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `CaseId`, `StepId`, `DocumentId`,
//!    `AuditEntryId` wrap UUIDs; `CaseNumber` and `UserRef` wrap validated
//!    strings. A `StepId` cannot be passed where a `CaseId` is expected.
//!
//! 2. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision, so
//!    the same instant always renders to the same string.
//!
//! 3. **Digests over canonical bytes.** Signature hashes are computed over
//!    `CanonicalBytes`, never over ad-hoc `serde_json::to_vec()` output.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `olympus-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_bytes_hex, sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{AuditEntryId, CaseId, CaseNumber, DocumentId, StepId, UserRef};
pub use temporal::Timestamp;
