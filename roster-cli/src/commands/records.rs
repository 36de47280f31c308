//! `roster records decide <record-id> keep|archive --by <employee-id>`

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};

use roster_core::{Decision, EmployeeId, RecordId};
use roster_store::records;

use super::{load_config, open_store, print_json};

#[derive(Subcommand, Debug)]
pub enum RecordsCommand {
    /// Record a reviewer decision on an orphaned record.
    Decide(DecideArgs),
}

#[derive(Args, Debug)]
pub struct DecideArgs {
    pub record_id: i64,

    #[arg(value_name = "keep|archive")]
    pub decision: Decision,

    /// Employee id of the reviewer.
    #[arg(long = "by")]
    pub decided_by: i64,

    #[arg(long)]
    pub json: bool,
}

pub fn run(command: RecordsCommand) -> Result<()> {
    match command {
        RecordsCommand::Decide(args) => decide(args),
    }
}

fn decide(args: DecideArgs) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let record = records::decide(
        store.conn(),
        RecordId(args.record_id),
        args.decision,
        EmployeeId(args.decided_by),
        Utc::now(),
    )
    .with_context(|| format!("cannot decide record {}", args.record_id))?;

    if args.json {
        return print_json(&record);
    }
    println!(
        "✓ Record {} ({}) marked '{}' by employee {}",
        record.id, record.external_ref, args.decision, args.decided_by
    );
    Ok(())
}
