//! # olympus-store: Case Record Persistence
//!
//! The [`CaseStore`] port and its two backends:
//!
//! - [`MemoryCaseStore`]: process-local, for development and tests.
//! - [`PgCaseStore`]: PostgreSQL via SQLx, with embedded migrations.
//!
//! The workflow service only talks to the trait, so backends can be swapped
//! at startup without touching workflow code.

pub mod error;
pub mod memory;
pub mod pg;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryCaseStore;
pub use pg::PgCaseStore;
pub use traits::{CaseCommit, CasePage, CaseQuery, CaseStore, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
