//! `roster jobs list|show|reap`: the job ledger.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::{Job, JobId, RecordAction, RecordStatus, SyncRecord};
use roster_store::{jobs, records, RecordFilter};
use roster_sync::{reap_stale_jobs, staleness::format_age};

use super::{load_config, open_store, print_json, status_label};

const DEFAULT_LIMIT: usize = 20;

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// Newest jobs first.
    List(ListArgs),
    /// One job with its records.
    Show(ShowArgs),
    /// Mark abandoned `running` jobs as `error`.
    Reap(ReapArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Number of jobs to show (1-100).
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: i64,

    /// Only records with this action.
    #[arg(long, value_name = "create|update|archive")]
    pub action: Option<RecordAction>,

    /// Only records with this status.
    #[arg(long, value_name = "applied|error|orphaned")]
    pub status: Option<RecordStatus>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ReapArgs {
    /// Age threshold. Defaults to `stale_job_after_secs` from config.yaml.
    #[arg(long)]
    pub older_than_secs: Option<u64>,
}

pub fn run(command: JobsCommand) -> Result<()> {
    match command {
        JobsCommand::List(args) => list(args),
        JobsCommand::Show(args) => show(args),
        JobsCommand::Reap(args) => reap(args),
    }
}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "id")]
    id: i64,
    #[tabled(rename = "trigger")]
    trigger: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "started")]
    started: String,
    #[tabled(rename = "created")]
    created: String,
    #[tabled(rename = "updated")]
    updated: String,
    #[tabled(rename = "archived")]
    archived: String,
    #[tabled(rename = "errors")]
    errors: String,
    #[tabled(rename = "orphaned")]
    orphaned: String,
}

fn list(args: ListArgs) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let jobs = jobs::list(store.conn(), args.limit).context("failed to list jobs")?;

    if args.json {
        return print_json(&jobs);
    }
    if jobs.is_empty() {
        println!("No sync jobs yet. Run: roster sync");
        return Ok(());
    }

    let now = Utc::now();
    let rows: Vec<JobRow> = jobs.iter().map(|job| job_row(job, now)).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn job_row(job: &Job, now: DateTime<Utc>) -> JobRow {
    // Running jobs have no summary yet.
    let count = |f: fn(&roster_core::JobSummary) -> u32| {
        job.summary
            .as_ref()
            .map(|s| f(s).to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    JobRow {
        id: job.id.0,
        trigger: job.trigger.to_string(),
        status: job.status.to_string(),
        started: format!("{} ago", format_age(job.started_at, now)),
        created: count(|s| s.created),
        updated: count(|s| s.updated),
        archived: count(|s| s.archived),
        errors: count(|s| s.errors),
        orphaned: count(|s| s.orphaned),
    }
}

#[derive(Serialize)]
struct JobDetail {
    job: Job,
    records: Vec<SyncRecord>,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "record")]
    id: i64,
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "code")]
    code: String,
    #[tabled(rename = "message")]
    message: String,
    #[tabled(rename = "decision")]
    decision: String,
}

fn show(args: ShowArgs) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let job = jobs::get(store.conn(), JobId(args.id))
        .with_context(|| format!("cannot load job {}", args.id))?;
    let filter = RecordFilter {
        action: args.action,
        status: args.status,
    };
    let records = records::list(store.conn(), job.id, filter)
        .with_context(|| format!("cannot load records of job {}", job.id))?;

    if args.json {
        return print_json(&JobDetail { job, records });
    }

    println!(
        "Job {} {} | trigger {} | started {}",
        job.id,
        status_label(job.status),
        job.trigger,
        job.started_at.to_rfc3339(),
    );
    if let Some(finished) = job.finished_at {
        println!("Finished {}", finished.to_rfc3339());
    }
    if let Some(error) = job.summary.as_ref().and_then(|s| s.error.as_deref()) {
        println!("{} {}", "aborted:".red().bold(), error);
    }
    if records.is_empty() {
        println!("No matching records.");
        return Ok(());
    }

    let rows: Vec<RecordRow> = records
        .into_iter()
        .map(|r| RecordRow {
            id: r.id.0,
            key: r.external_ref,
            action: r.action.to_string(),
            status: r.status.to_string(),
            code: r.error_code.map(|c| c.to_string()).unwrap_or_default(),
            message: r.message.unwrap_or_default(),
            decision: r.decision.map(|d| d.to_string()).unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn reap(args: ReapArgs) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let older_than = args
        .older_than_secs
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| config.stale_job_after());

    let reaped = reap_stale_jobs(store.conn(), older_than, Utc::now())
        .context("failed to reap stale jobs")?;
    if reaped.is_empty() {
        println!("No abandoned jobs.");
    } else {
        let ids: Vec<String> = reaped.iter().map(ToString::to_string).collect();
        println!("✓ Marked {} job(s) as error: {}", reaped.len(), ids.join(", "));
    }
    Ok(())
}
