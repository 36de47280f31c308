//! # roster-sync
//!
//! Directory synchronization engine.
//!
//! Call [`run`] (or [`run_file`]) with a [`SyncContext`] to reconcile one
//! payload from the system of record into the local store. Each call is one
//! job; per-record faults are isolated and recorded, everything else aborts
//! the job and rolls its writes back.

pub mod credential;
pub mod error;
pub mod ledger;
pub mod managers;
pub mod org_units;
pub mod orphans;
pub mod pipeline;
pub mod preprocess;
pub mod snapshot;
pub mod staleness;
pub mod upsert;

pub use credential::{hasher_for, CredentialHasher, PassThrough, Sha256Hasher};
pub use error::{PayloadError, RecordFailure, SyncError};
pub use pipeline::{load_payload, run, run_file, JobReport, SyncContext};
pub use staleness::reap_stale_jobs;
