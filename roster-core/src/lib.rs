//! Roster core library: domain types, descriptors, configuration, errors.
//!
//! - [`types`]: row ids, ledger and directory structs, wire enums
//! - [`descriptor`]: [`Descriptor`], the canonical incoming employee
//! - [`config`]: load / save / init of `~/.roster/config.yaml`
//! - [`error`]: [`ConfigError`], [`UnknownVariant`]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod types;

pub use config::{Config, CredentialScheme, Schedule};
pub use descriptor::Descriptor;
pub use error::{ConfigError, UnknownVariant};
pub use types::{
    Decision, Employee, EmployeeId, EmployeeStatus, ErrorCode, Job, JobId, JobStatus, JobSummary,
    NewRecord, OrgUnit, OrgUnitId, OrgUnitType, RecordAction, RecordId, RecordStatus, Snapshot,
    SyncRecord, Trigger,
};
