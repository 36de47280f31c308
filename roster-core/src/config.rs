//! YAML configuration for the roster tools.
//!
//! # Storage layout
//!
//! ```text
//! ~/.roster/
//!   config.yaml   (mode 0600)
//!   roster.db     (default database location)
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_STALE_JOB_AFTER_SECS: u64 = 6 * 60 * 60;

/// Scheduled-trigger settings used by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub interval_secs: u64,
    pub debounce_ms: u64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl Schedule {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// How incoming credential hashes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScheme {
    /// Store the value from the source as is.
    #[default]
    Passthrough,
    /// Hash plaintext values to `sha256$<hex>`.
    Sha256,
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,
    /// JSON payload read by scheduled runs and by `roster sync` without `--file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub schedule: Schedule,
    /// A `running` job older than this is considered abandoned.
    #[serde(default = "default_stale_job_after_secs")]
    pub stale_job_after_secs: u64,
    #[serde(default)]
    pub credentials: CredentialScheme,
}

fn default_stale_job_after_secs() -> u64 {
    DEFAULT_STALE_JOB_AFTER_SECS
}

impl Config {
    /// Defaults rooted at `home`.
    pub fn default_at(home: &Path) -> Self {
        Self {
            database: roster_dir_at(home).join("roster.db"),
            source: None,
            schedule: Schedule::default(),
            stale_job_after_secs: DEFAULT_STALE_JOB_AFTER_SECS,
            credentials: CredentialScheme::default(),
        }
    }

    pub fn stale_job_after(&self) -> Duration {
        Duration::from_secs(self.stale_job_after_secs)
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.roster/`. Pure, no I/O.
pub fn roster_dir_at(home: &Path) -> PathBuf {
    home.join(".roster")
}

/// `<home>/.roster/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    roster_dir_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.roster/config.yaml`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `<home>/.roster/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let dir = roster_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Create or update `<home>/.roster/config.yaml`.
///
/// Existing settings are kept; `database` and `source` are replaced only when
/// given.
pub fn init_at(
    home: &Path,
    database: Option<PathBuf>,
    source: Option<PathBuf>,
) -> Result<Config, ConfigError> {
    let mut config = match load_at(home) {
        Ok(existing) => existing,
        Err(ConfigError::NotFound { .. }) => Config::default_at(home),
        Err(e) => return Err(e),
    };
    if let Some(database) = database {
        config.database = database;
    }
    if source.is_some() {
        config.source = source;
    }
    save_at(home, &config)?;
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init(database: Option<PathBuf>, source: Option<PathBuf>) -> Result<Config, ConfigError> {
    init_at(&home()?, database, source)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The current user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
