//! # Template Subcommand
//!
//! Checks workflow template files before they are deployed, and lists the
//! templates a server would see.
//!
//! - `validate <file>...`: parse and validate one or more YAML files.
//! - `list [--file <file>]`: built-in templates plus those in `file`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use olympus_workflow::TemplateCatalog;

/// Arguments for the `olympus template` subcommand.
#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(subcommand)]
    pub command: TemplateCommand,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Validate workflow template files. Exits 1 if any file is invalid.
    Validate {
        /// YAML files with a top-level `templates:` list.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List available templates and their steps.
    List {
        /// Extra templates to load on top of the built-in ones.
        #[arg(long, env = "OLYMPUS_TEMPLATES")]
        file: Option<PathBuf>,
    },
}

/// Execute the template subcommand.
pub fn run_template(args: &TemplateArgs, out: &mut impl Write) -> Result<u8> {
    match &args.command {
        TemplateCommand::Validate { files } => cmd_validate(files, out),
        TemplateCommand::List { file } => cmd_list(file.as_ref(), out),
    }
}

fn cmd_validate(files: &[PathBuf], out: &mut impl Write) -> Result<u8> {
    let mut failures = 0;
    for path in files {
        // Fresh catalog per file.
        let mut catalog = TemplateCatalog::builtin();
        match catalog.load_yaml_file(path) {
            Ok(count) => writeln!(out, "OK: {} ({count} templates)", path.display())?,
            Err(e) => {
                failures += 1;
                writeln!(out, "FAIL: {}: {e}", path.display())?;
            }
        }
    }
    Ok(if failures == 0 { 0 } else { 1 })
}

fn cmd_list(file: Option<&PathBuf>, out: &mut impl Write) -> Result<u8> {
    let mut catalog = TemplateCatalog::builtin();
    if let Some(path) = file {
        catalog
            .load_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    for t in catalog.list() {
        match &t.description {
            Some(d) => writeln!(out, "{}: {d}", t.name)?,
            None => writeln!(out, "{}", t.name)?,
        }
        for (i, step) in t.steps.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, step.title)?;
        }
    }
    Ok(0)
}
