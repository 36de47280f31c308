//! Config error-message, atomic-write-safety, and init integration tests.
//! Storage: ~/.roster/config.yaml

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use roster_core::{config, ConfigError};
use std::fs;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_names_path_and_hint() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("config.yaml"), "must contain file path, got: {msg}");
    assert!(msg.contains("roster init"), "must hint at init, got: {msg}");
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".roster/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_without_database_key_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".roster/config.yaml")
        .write_str("source: /data/ad.json\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn partial_schedule_is_filled_with_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".roster/config.yaml")
        .write_str("database: /srv/roster.db\nschedule:\n  interval_secs: 90\n")
        .expect("write");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded.database, PathBuf::from("/srv/roster.db"));
    assert_eq!(loaded.schedule.interval_secs, 90);
    assert_eq!(loaded.schedule.debounce_ms, config::DEFAULT_DEBOUNCE_MS);
    assert_eq!(loaded.stale_job_after_secs, config::DEFAULT_STALE_JOB_AFTER_SECS);
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::init_at(home.path(), None, None).expect("init");

    let path = config::config_path_at(home.path());
    let original_bytes = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_file_name("config.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    let current_bytes = fs::read(&path).expect("read after crash");
    assert_eq!(original_bytes, current_bytes, "original must be unchanged after crash");
    assert!(config::load_at(home.path()).is_ok(), "config must still load");
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_with_restrictive_mode() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = config::init_at(home.path(), None, Some(PathBuf::from("/data/ad.json")))
        .expect("init");

    home.child(".roster/config.yaml")
        .assert(predicate::path::exists());
    assert_eq!(cfg.source, Some(PathBuf::from("/data/ad.json")));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = config::config_path_at(home.path());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn init_is_idempotent() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let first = config::init_at(home.path(), None, None).expect("first init");
    let second = config::init_at(home.path(), None, None).expect("second init");
    assert_eq!(first, second);
}
