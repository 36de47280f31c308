//! Run orchestrator: one job per payload, shared by the CLI and the daemon.
//!
//! ## Run protocol
//!
//! 1. Parse the payload. A rejected payload creates no job.
//! 2. Reap stale `running` jobs.
//! 3. Create the job (`running`, autocommit) so it survives an abort.
//! 4. Open the job's unit of work. Per descriptor: duplicate check,
//!    snapshot, email check, department lookup, upsert inside a record scope.
//! 5. Link managers, then flag orphans.
//! 6. Finish the job and commit.
//!
//! Any error outside a record scope drops the unit of work (rolling back
//! every write of the run) and finishes the job as `error`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use roster_core::{
    Descriptor, EmployeeId, ErrorCode, JobId, JobStatus, JobSummary, NewRecord, Trigger,
};
use roster_store::{employees, jobs, records, Store, UnitOfWork};

use crate::credential::{CredentialHasher, PassThrough};
use crate::error::{io_err, PayloadError, RecordFailure, SyncError};
use crate::managers::{self, ManagerQueue};
use crate::upsert::{self, UpsertOutcome};
use crate::{ledger, org_units, orphans, preprocess, snapshot, staleness};

/// Everything a run needs, passed explicitly.
pub struct SyncContext<'s> {
    store: &'s mut Store,
    hasher: Box<dyn CredentialHasher>,
    stale_after: Option<Duration>,
}

impl<'s> SyncContext<'s> {
    /// Pass-through credentials, no stale-job reaping.
    pub fn new(store: &'s mut Store) -> Self {
        Self {
            store,
            hasher: Box::new(PassThrough),
            stale_after: None,
        }
    }

    pub fn with_hasher(mut self, hasher: Box<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Reap `running` jobs older than `after` before each run.
    pub fn with_stale_after(mut self, after: Duration) -> Self {
        self.stale_after = Some(after);
        self
    }
}

/// Result of one run, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub summary: JobSummary,
}

/// Read and parse a JSON payload file.
pub fn load_payload(path: &Path) -> Result<Value, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let payload = serde_json::from_str(&contents).map_err(PayloadError::Malformed)?;
    Ok(payload)
}

/// [`load_payload`] followed by [`run`].
pub fn run_file(
    ctx: &mut SyncContext<'_>,
    path: &Path,
    trigger: Trigger,
) -> Result<JobReport, SyncError> {
    let payload = load_payload(path)?;
    run(ctx, &payload, trigger)
}

/// Run one sync job over `payload`.
///
/// Returns `Err` only when no job could be recorded: a rejected payload, or a
/// storage fault while creating or finishing the job row. A job that aborted
/// mid-run is reported as `Ok` with status `error`.
pub fn run(
    ctx: &mut SyncContext<'_>,
    payload: &Value,
    trigger: Trigger,
) -> Result<JobReport, SyncError> {
    let descriptors = preprocess::normalize(payload)?;

    if let Some(after) = ctx.stale_after {
        staleness::reap_stale_jobs(ctx.store.conn(), after, Utc::now())?;
    }

    let job_id = jobs::create(ctx.store.conn(), trigger, Utc::now())?;
    tracing::info!(
        job_id = %job_id,
        trigger = %trigger,
        descriptors = descriptors.len(),
        "sync job started"
    );

    match process(ctx.store, ctx.hasher.as_ref(), job_id, &descriptors) {
        Ok(summary) => {
            let status = ledger::final_status(&summary);
            tracing::info!(
                job_id = %job_id,
                status = %status,
                created = summary.created,
                updated = summary.updated,
                archived = summary.archived,
                unchanged = summary.unchanged,
                errors = summary.errors,
                orphaned = summary.orphaned,
                "sync job finished"
            );
            Ok(JobReport {
                job_id,
                status,
                summary,
            })
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "sync job aborted; changes rolled back");
            let summary = ledger::aborted(e.to_string());
            jobs::finish(ctx.store.conn(), job_id, JobStatus::Error, &summary, Utc::now())?;
            Ok(JobReport {
                job_id,
                status: JobStatus::Error,
                summary,
            })
        }
    }
}

/// Steps 4 to 6 inside one unit of work. An `Err` leaves nothing behind.
fn process(
    store: &mut Store,
    hasher: &dyn CredentialHasher,
    job_id: JobId,
    descriptors: &[Descriptor],
) -> Result<JobSummary, SyncError> {
    let mut uow = store.begin()?;
    let mut summary = JobSummary::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(descriptors.len());
    let mut batch: HashMap<String, EmployeeId> = HashMap::new();
    let mut queue = ManagerQueue::default();

    for descriptor in descriptors {
        let key = descriptor.identity_key();
        let now = Utc::now();

        let outcome = if seen.insert(key) {
            snapshot::record(uow.conn(), job_id, descriptor, now)?;
            apply(&mut uow, hasher, job_id, descriptor)?
        } else {
            Err(RecordFailure::new(
                ErrorCode::DuplicateInBatch,
                format!("'{key}' appears more than once in the payload"),
            ))
        };

        match outcome {
            Ok(UpsertOutcome {
                employee_id,
                change,
            }) => {
                ledger::count_change(&mut summary, change);
                if let Some(external_ref) = &descriptor.external_ref {
                    batch.insert(external_ref.clone(), employee_id);
                }
                if let Some(manager_ref) = descriptor.manager_ref() {
                    queue.push(employee_id, manager_ref);
                }
            }
            Err(failure) => {
                let action = upsert::intended_action(uow.conn(), descriptor)?;
                tracing::warn!(
                    job_id = %job_id,
                    key = %key,
                    code = %failure.code,
                    message = %failure.message,
                    "record failed"
                );
                records::insert(
                    uow.conn(),
                    &NewRecord::failed(job_id, key, action, failure.code, failure.message),
                    now,
                )?;
                summary.errors += 1;
            }
        }
    }

    let now = Utc::now();
    let links = if queue.is_empty() {
        managers::LinkStats::default()
    } else {
        managers::link_managers(uow.conn(), queue, &batch, now)?
    };
    summary.managers_linked = links.linked;
    summary.managers_deferred = links.deferred;
    if links.deferred > 0 {
        tracing::info!(job_id = %job_id, deferred = links.deferred, "manager links deferred to a later run");
    }

    let incoming = orphans::incoming_keys(descriptors);
    let active = employees::list_active(uow.conn())?;
    for record in orphans::detect_orphans(job_id, &incoming, &active) {
        records::insert(uow.conn(), &record, now)?;
        summary.orphaned += 1;
    }

    jobs::finish(
        uow.conn(),
        job_id,
        ledger::final_status(&summary),
        &summary,
        Utc::now(),
    )?;
    uow.commit()?;
    Ok(summary)
}

/// Validate, resolve and upsert one descriptor. Storage faults inside the
/// record scope become `UPSERT_FAILED`; the outer `Err` is reserved for faults
/// that must abort the job.
fn apply(
    uow: &mut UnitOfWork<'_>,
    hasher: &dyn CredentialHasher,
    job_id: JobId,
    descriptor: &Descriptor,
) -> Result<Result<UpsertOutcome, RecordFailure>, SyncError> {
    if descriptor.email.is_empty() {
        return Ok(Err(RecordFailure::new(
            ErrorCode::EmailMissing,
            "email is required",
        )));
    }
    let department = match org_units::resolve(uow.conn(), descriptor)? {
        Ok(id) => id,
        Err(failure) => return Ok(Err(failure)),
    };

    let now = Utc::now();
    let scope = uow.scope()?;
    let result = upsert::upsert(scope.conn(), descriptor, department, hasher, now).and_then(
        |outcome| {
            if let Some(action) = outcome.change.action() {
                records::insert(
                    scope.conn(),
                    &NewRecord::applied(job_id, descriptor.identity_key(), action),
                    now,
                )?;
            } else {
                tracing::debug!(key = %descriptor.identity_key(), "employee unchanged");
            }
            Ok(outcome)
        },
    );

    match result {
        Ok(outcome) => {
            scope.commit()?;
            Ok(Ok(outcome))
        }
        Err(e) => {
            scope.rollback()?;
            Ok(Err(RecordFailure::new(ErrorCode::UpsertFailed, e.to_string())))
        }
    }
}
