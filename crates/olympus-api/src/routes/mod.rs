//! # API Route Modules
//!
//! - `cases`: case lifecycle, steps and audit history.
//! - `documents`: document attachment and signing.
//! - `templates`: the workflow template catalog.

pub mod cases;
pub mod documents;
pub mod templates;
