//! # Case Subcommand
//!
//! Case administration against the PostgreSQL case store, through the same
//! [`CaseService`] the API uses, so every rule and audit entry applies.
//!
//! ## Subcommands
//!
//! - `create`: Open a case from a template or an explicit step list.
//! - `start`: OPEN → IN_PROGRESS.
//! - `complete`: Complete one step.
//! - `show`: Case with steps and documents.
//! - `history`: Audit trail.
//! - `list`: Cases, newest first.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use olympus_core::{CaseId, CaseNumber, UserRef};
use olympus_state::{CaseFile, CaseStatus, StepDefinition, StepOrderPolicy};
use olympus_store::{CaseQuery, PgCaseStore, DEFAULT_PAGE_LIMIT};
use olympus_workflow::{CaseService, NewCase, StepSource, TemplateCatalog, BUILTIN_TEMPLATE};

/// Arguments for the `olympus case` subcommand.
#[derive(Args, Debug)]
pub struct CaseArgs {
    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Extra workflow templates.
    #[arg(long, env = "OLYMPUS_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// Step ordering: strict or relaxed.
    #[arg(long, env = "OLYMPUS_STEP_ORDER", default_value = "strict")]
    pub step_order: StepOrderPolicy,

    /// Acting user recorded on steps and audit entries.
    #[arg(long, global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: CaseCommand,
}

#[derive(Subcommand, Debug)]
pub enum CaseCommand {
    /// Open a new case with all steps PENDING.
    Create {
        /// Case number (e.g. "EXP-2024-0001").
        #[arg(long)]
        number: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        /// Workflow template name.
        #[arg(long, conflicts_with = "step", default_value = BUILTIN_TEMPLATE)]
        template: String,
        /// Explicit step title; repeat for each step in order.
        #[arg(long)]
        step: Vec<String>,
    },

    /// Start a case (OPEN → IN_PROGRESS).
    Start {
        #[arg(long)]
        id: CaseId,
    },

    /// Complete step `step` of a case.
    Complete {
        #[arg(long)]
        id: CaseId,
        /// Step number, starting at 1.
        #[arg(long)]
        step: u32,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Show a case with its steps and documents.
    Show {
        #[arg(long)]
        id: CaseId,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the audit trail of a case.
    History {
        #[arg(long)]
        id: CaseId,
        #[arg(long)]
        json: bool,
    },

    /// List cases, newest first.
    List {
        /// OPEN, IN_PROGRESS or CLOSED.
        #[arg(long)]
        status: Option<CaseStatus>,
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
}

/// Execute the case subcommand.
pub fn run_case(args: &CaseArgs, out: &mut impl Write) -> Result<u8> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let service = connect(args).await?;
        execute(&service, args, out).await
    })
}

async fn connect(args: &CaseArgs) -> Result<CaseService> {
    let mut templates = TemplateCatalog::builtin();
    if let Some(path) = &args.templates {
        templates
            .load_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    let store = PgCaseStore::connect(&args.database_url)
        .await
        .context("failed to connect to the case store")?;
    Ok(CaseService::new(Arc::new(store), templates, args.step_order))
}

/// Run one case command against `service`.
pub async fn execute(service: &CaseService, args: &CaseArgs, out: &mut impl Write) -> Result<u8> {
    let actor = args
        .actor
        .as_deref()
        .map(UserRef::new)
        .transpose()
        .context("invalid --actor")?;

    match &args.command {
        CaseCommand::Create {
            number,
            subject,
            description,
            owner,
            template,
            step,
        } => {
            let workflow = if step.is_empty() {
                StepSource::Template(template.clone())
            } else {
                StepSource::Steps(step.iter().map(|t| StepDefinition::new(t.as_str(), None)).collect())
            };
            let new = NewCase {
                number: CaseNumber::new(number).context("invalid --number")?,
                subject: subject.clone(),
                description: description.clone(),
                owner: owner
                    .as_deref()
                    .map(UserRef::new)
                    .transpose()
                    .context("invalid --owner")?,
                workflow,
            };
            let file = service.create_case(new).await?;
            writeln!(
                out,
                "OK: created case {} ({}) with {} steps",
                file.case().number,
                file.case().id,
                file.steps().len()
            )?;
        }

        CaseCommand::Start { id } => {
            let case = service.start_case(*id, actor).await?;
            writeln!(out, "OK: case {} is {}", case.number, case.status)?;
        }

        CaseCommand::Complete { id, step, comment } => {
            let done = service
                .complete_step(*id, *step, comment.clone(), actor)
                .await?;
            writeln!(out, "OK: step {} '{}' completed", done.sequence, done.title)?;
            let case = service.get_case(*id).await?;
            if case.is_closed() {
                writeln!(out, "OK: case {} is CLOSED", case.number)?;
            }
        }

        CaseCommand::Show { id, json } => {
            let file = service.get_case_file(*id).await?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&file)?)?;
            } else {
                print_case_file(&file, out)?;
            }
        }

        CaseCommand::History { id, json } => {
            let history = service.get_history(*id).await?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&history)?)?;
            } else {
                for e in &history {
                    let actor = e.actor.as_ref().map_or("-", UserRef::as_str);
                    writeln!(
                        out,
                        "[{}] {} {} {} {}",
                        e.sequence, e.recorded_at, e.action, actor, e.description
                    )?;
                }
            }
        }

        CaseCommand::List {
            status,
            skip,
            limit,
        } => {
            let page = service
                .list_cases(CaseQuery {
                    status: *status,
                    skip: *skip,
                    limit: *limit,
                })
                .await?;
            for c in &page.items {
                writeln!(out, "{}  {:<11}  {}  {}", c.id, c.status, c.number, c.subject)?;
            }
            writeln!(out, "{} of {} cases", page.items.len(), page.total)?;
        }
    }
    Ok(0)
}

fn print_case_file(file: &CaseFile, out: &mut impl Write) -> Result<()> {
    let case = file.case();
    writeln!(out, "Case: {} ({})", case.number, case.id)?;
    writeln!(out, "  Subject: {}", case.subject)?;
    writeln!(out, "  Status: {}", case.status)?;
    if let Some(owner) = &case.owner {
        writeln!(out, "  Owner: {owner}")?;
    }
    writeln!(out, "  Created: {}", case.created_at)?;
    if let Some(closed) = &case.closed_at {
        writeln!(out, "  Closed: {closed}")?;
    }
    writeln!(
        out,
        "  Steps: {}/{} completed",
        file.completed_count(),
        file.steps().len()
    )?;
    for s in file.steps() {
        writeln!(out, "    {}. [{}] {}", s.sequence, s.status, s.title)?;
    }
    for d in file.documents() {
        let signed = if d.is_signed() { "signed" } else { "unsigned" };
        writeln!(out, "  Document: {} [{}] {signed}", d.name, d.kind)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use olympus_store::MemoryCaseStore;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        case: CaseArgs,
    }

    fn parse(args: &[&str]) -> CaseArgs {
        let mut argv = vec!["olympus", "--database-url", "postgres://unused"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().case
    }

    fn service() -> CaseService {
        CaseService::new(
            Arc::new(MemoryCaseStore::new()),
            TemplateCatalog::builtin(),
            StepOrderPolicy::Strict,
        )
    }

    async fn run(service: &CaseService, args: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        execute(service, &parse(args), &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn create_start_complete_close() {
        let svc = service();
        let text = run(
            &svc,
            &["create", "--number", "EXP-9", "--subject", "Vado", "--step", "Uno", "--step", "Dos"],
        )
        .await
        .unwrap();
        assert!(text.contains("with 2 steps"), "{text}");
        let id = svc.list_cases(CaseQuery::default()).await.unwrap().items[0].id.to_string();

        run(&svc, &["--actor", "ana", "start", "--id", &id]).await.unwrap();
        run(&svc, &["complete", "--id", &id, "--step", "1"]).await.unwrap();
        let text = run(&svc, &["complete", "--id", &id, "--step", "2", "--comment", "ok"])
            .await
            .unwrap();
        assert!(text.contains("is CLOSED"), "{text}");

        let history = run(&svc, &["history", "--id", &id]).await.unwrap();
        assert_eq!(history.lines().count(), 4);
        assert!(history.lines().next().unwrap().contains("case_started ana"));
    }

    #[tokio::test]
    async fn create_uses_builtin_template_by_default() {
        let svc = service();
        run(&svc, &["create", "--number", "EXP-10", "--subject", "Ayuda"]).await.unwrap();
        let id = svc.list_cases(CaseQuery::default()).await.unwrap().items[0].id;
        let text = run(&svc, &["show", "--id", &id.to_string()]).await.unwrap();
        assert!(text.contains("Steps: 0/4 completed"), "{text}");
        assert!(text.contains("4. [PENDING] Notificar"), "{text}");
    }

    #[tokio::test]
    async fn out_of_order_is_an_error() {
        let svc = service();
        run(&svc, &["create", "--number", "EXP-11", "--subject", "X"]).await.unwrap();
        let id = svc.list_cases(CaseQuery::default()).await.unwrap().items[0].id.to_string();
        run(&svc, &["start", "--id", &id]).await.unwrap();
        let err = run(&svc, &["complete", "--id", &id, "--step", "3"]).await.unwrap_err();
        assert!(err.to_string().contains("before step 1"), "{err}");
    }

    #[test]
    fn template_and_steps_conflict() {
        let argv = [
            "olympus",
            "--database-url",
            "postgres://unused",
            "create",
            "--number",
            "E",
            "--subject",
            "S",
            "--template",
            "x",
            "--step",
            "Uno",
        ];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn list_parses_status() {
        let args = parse(&["list", "--status", "IN_PROGRESS", "--limit", "5"]);
        match args.command {
            CaseCommand::List { status, limit, .. } => {
                assert_eq!(status, Some(CaseStatus::InProgress));
                assert_eq!(limit, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
