//! # olympus-workflow: Case Workflow Service
//!
//! [`CaseService`] is the entry point for everything that reads or changes a
//! case: create, start, complete steps, update details, attach and sign
//! documents, and read steps and history. It serializes state-changing
//! operations per case and commits each one atomically through the injected
//! [`olympus_store::CaseStore`].
//!
//! The [`TemplateCatalog`] supplies the step lists new cases are created
//! from.

pub mod error;
mod locks;
pub mod service;
pub mod templates;

pub use error::WorkflowError;
pub use service::{CaseService, NewCase, NewDocument, StepSource};
pub use templates::{TemplateCatalog, TemplateError, BUILTIN_TEMPLATE};
