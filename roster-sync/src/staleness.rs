//! Recovery of abandoned jobs.
//!
//! A job that crashed mid-run stays `running` forever. Every run first reaps
//! `running` jobs older than the configured threshold: they are finished as
//! `error` with an `abandoned` message. Fresh jobs may still overlap; no lock
//! is taken.

use std::time::Duration;

use chrono::{DateTime, Utc};

use roster_core::{JobId, JobStatus};
use roster_store::{jobs, Connection, StoreError};

use crate::error::SyncError;
use crate::ledger;

/// Finish every `running` job started before `now - older_than` as `error`.
/// Returns the reaped job ids.
pub fn reap_stale_jobs(
    conn: &Connection,
    older_than: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<JobId>, SyncError> {
    let Some(cutoff) = chrono::Duration::from_std(older_than)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
    else {
        return Ok(Vec::new());
    };
    let mut reaped = Vec::new();
    for job in jobs::list_running(conn)? {
        if job.started_at >= cutoff {
            continue;
        }
        let summary = ledger::aborted(format!(
            "abandoned: no heartbeat within {}s",
            older_than.as_secs()
        ));
        match jobs::finish(conn, job.id, JobStatus::Error, &summary, now) {
            Ok(()) => {
                tracing::warn!(
                    job_id = %job.id,
                    age = %format_age(job.started_at, now),
                    "reaped abandoned sync job"
                );
                reaped.push(job.id);
            }
            // Finished by its own run in the meantime.
            Err(StoreError::JobFinished { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(reaped)
}

/// Compact age of `since` relative to `now`, e.g. `5m` or `2d`.
pub fn format_age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(since).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
