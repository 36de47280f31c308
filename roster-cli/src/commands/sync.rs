//! `roster sync`: run one job over a JSON payload.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::{JobStatus, Trigger};
use roster_sync::{hasher_for, run_file, JobReport, SyncContext};

use super::{load_config, open_store, print_json, status_label};

/// Arguments for `roster sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Payload file. Defaults to `source` from config.yaml.
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Recorded trigger of the job.
    #[arg(long, default_value = "manual", value_name = "manual|scheduled")]
    pub trigger: Trigger,

    /// Emit the job report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let file = match self.file.or_else(|| config.source.clone()) {
            Some(file) => file,
            None => bail!("no payload: pass --file or set `source` with `roster init --source`"),
        };

        let mut store = open_store(&config)?;
        let report = {
            let mut ctx = SyncContext::new(&mut store)
                .with_hasher(hasher_for(config.credentials))
                .with_stale_after(config.stale_job_after());
            run_file(&mut ctx, &file, self.trigger)
                .with_context(|| format!("sync failed for '{}'", file.display()))?
        };

        if self.json {
            print_json(&report)?;
        } else {
            print_report(&report);
        }

        if report.status == JobStatus::Error {
            bail!("job {} finished with status error", report.job_id);
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct CounterRow {
    #[tabled(rename = "created")]
    created: u32,
    #[tabled(rename = "updated")]
    updated: u32,
    #[tabled(rename = "archived")]
    archived: u32,
    #[tabled(rename = "unchanged")]
    unchanged: u32,
    #[tabled(rename = "errors")]
    errors: u32,
    #[tabled(rename = "orphaned")]
    orphaned: u32,
    #[tabled(rename = "managers")]
    managers: String,
}

fn print_report(report: &JobReport) {
    let s = &report.summary;
    println!("Job {} {}", report.job_id, status_label(report.status));

    let mut table = Table::new([CounterRow {
        created: s.created,
        updated: s.updated,
        archived: s.archived,
        unchanged: s.unchanged,
        errors: s.errors,
        orphaned: s.orphaned,
        managers: format!("{} linked, {} deferred", s.managers_linked, s.managers_deferred),
    }]);
    table.with(Style::rounded());
    println!("{table}");

    if let Some(error) = &s.error {
        println!("{} {}", "aborted:".red().bold(), error);
    }
    if s.errors > 0 || s.orphaned > 0 {
        println!("Run 'roster jobs show {}' for per-record details.", report.job_id);
    }
}
