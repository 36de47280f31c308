//! Job summary bookkeeping and the final status rule.

use roster_core::{JobStatus, JobSummary};

use crate::upsert::Change;

/// Count one descriptor's upsert outcome.
pub fn count_change(summary: &mut JobSummary, change: Change) {
    match change {
        Change::Created => summary.created += 1,
        Change::Updated => summary.updated += 1,
        Change::Dismissed => summary.archived += 1,
        Change::Unchanged => summary.unchanged += 1,
    }
}

/// `success` without errors, `partial` when something was still applied,
/// `error` otherwise.
pub fn final_status(summary: &JobSummary) -> JobStatus {
    if summary.errors == 0 {
        JobStatus::Success
    } else if summary.applied() > 0 {
        JobStatus::Partial
    } else {
        JobStatus::Error
    }
}

/// Summary of a job whose write set was rolled back.
pub fn aborted(message: impl Into<String>) -> JobSummary {
    JobSummary {
        errors: 1,
        error: Some(message.into()),
        ..Default::default()
    }
}
