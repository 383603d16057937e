//! # olympus-cli
//!
//! Operator tooling for Olympus Smart Gov.
//!
//! ## Subcommands
//!
//! - `template`: validate and list workflow template files.
//! - `case`: create, start, complete, inspect and list cases directly
//!   against the PostgreSQL case store.
//!
//! Handlers take an output writer and return the process exit code, so the
//! binary stays a thin dispatcher and the handlers can be tested in-process.

pub mod case;
pub mod template;
