//! `roster init [--database <path>] [--source <path>]`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use roster_core::config;

use super::open_store;

/// Write ~/.roster/config.yaml and create the database.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// SQLite database file. Defaults to ~/.roster/roster.db.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// JSON payload read by scheduled runs and by `roster sync` without `--file`.
    #[arg(long)]
    pub source: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let database = self.database.as_deref().map(absolute).transpose()?;
        let source = self.source.as_deref().map(absolute).transpose()?;

        let config = config::init(database, source).context("failed to write config")?;
        open_store(&config)?;

        let home = config::home()?;
        println!("✓ Wrote {}", config::config_path_at(&home).display());
        println!("  Database: {}", config.database.display());
        match &config.source {
            Some(source) => println!("  Source:   {}", source.display()),
            None => println!("  Source:   (none; pass --file to `roster sync`)"),
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot resolve current directory")?;
    Ok(cwd.join(path))
}
