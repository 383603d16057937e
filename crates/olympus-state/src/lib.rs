//! # olympus-state: Case Workflow State Machines
//!
//! The rules of a case file, independent of storage and transport.
//!
//! ## State Machines
//!
//! - **Case** (`case.rs`): `OPEN → IN_PROGRESS → CLOSED`, monotonic.
//!
//! - **Step** (`step.rs`): `PENDING → IN_PROGRESS → COMPLETED`.
//!
//! - **Case file** (`case_file.rs`): the step sequencer. Completes steps in
//!   order, promotes the next step and closes the case after the last one.
//!   Also attaches and signs documents.
//!
//! ## Audit
//!
//! Every operation on a [`CaseFile`] writes its audit entries into an
//! [`AuditRecorder`] supplied by the caller. The recorder's entries are
//! committed together with the mutated case file, never separately.

pub mod audit;
pub mod case;
pub mod case_file;
pub mod document;
pub mod error;
pub mod step;
pub mod template;

// ─── Case re-exports ────────────────────────────────────────────────

pub use case::{Case, CaseStatus};
pub use case_file::{CaseDetailsUpdate, CaseFile, StepCompletion};
pub use error::CaseError;
pub use step::{Step, StepOrderPolicy, StepStatus};

// ─── Document re-exports ────────────────────────────────────────────

pub use document::{Document, DocumentKind, DocumentSignature};

// ─── Audit re-exports ───────────────────────────────────────────────

pub use audit::{AuditAction, AuditEntry, AuditRecorder, PendingAuditEntry};

// ─── Template re-exports ────────────────────────────────────────────

pub use template::{StepDefinition, WorkflowTemplate};
