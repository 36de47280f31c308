//! `roster daemon`: scheduled syncs in the foreground.

use anyhow::{Context, Result};

use super::load_config;

pub fn run() -> Result<()> {
    let config = load_config()?;
    roster_daemon::start_blocking(config).context("daemon exited with error")
}
