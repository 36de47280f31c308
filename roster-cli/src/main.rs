//! Roster: employee directory sync CLI.
//!
//! # Usage
//!
//! ```text
//! roster init [--database <path>] [--source <path>]
//! roster org import <file>
//! roster org list
//! roster sync [--file <path>] [--trigger manual|scheduled] [--json]
//! roster jobs list [--limit N] [--json]
//! roster jobs show <id> [--action ..] [--status ..] [--json]
//! roster jobs reap [--older-than-secs N]
//! roster records decide <record-id> keep|archive --by <employee-id>
//! roster daemon
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    init::InitArgs, jobs::JobsCommand, org::OrgCommand, records::RecordsCommand, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Synchronize an employee directory from a system of record",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ~/.roster/config.yaml and create the database.
    Init(InitArgs),

    /// Seed and inspect the org-unit hierarchy.
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },

    /// Run one sync job over a JSON payload.
    Sync(SyncArgs),

    /// Inspect the job ledger.
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },

    /// Review sync records.
    Records {
        #[command(subcommand)]
        command: RecordsCommand,
    },

    /// Run scheduled syncs in the foreground until ctrl-c.
    Daemon,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    roster_daemon::init_tracing();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Org { command } => commands::org::run(command),
        Commands::Sync(args) => args.run(),
        Commands::Jobs { command } => commands::jobs::run(command),
        Commands::Records { command } => commands::records::run(command),
        Commands::Daemon => commands::daemon::run(),
    }
}
