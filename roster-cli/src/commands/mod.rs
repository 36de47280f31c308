pub mod daemon;
pub mod init;
pub mod jobs;
pub mod org;
pub mod records;
pub mod sync;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};

use roster_core::{config, Config, JobStatus};
use roster_store::Store;

pub(crate) fn load_config() -> Result<Config> {
    config::load().context("failed to load config; run `roster init` first")
}

pub(crate) fn open_store(config: &Config) -> Result<Store> {
    Store::open(&config.database)
        .with_context(|| format!("failed to open database '{}'", config.database.display()))
}

pub(crate) fn status_label(status: JobStatus) -> ColoredString {
    match status {
        JobStatus::Running => status.as_str().cyan(),
        JobStatus::Success => status.as_str().green().bold(),
        JobStatus::Partial => status.as_str().yellow().bold(),
        JobStatus::Error => status.as_str().red().bold(),
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON output")?
    );
    Ok(())
}
