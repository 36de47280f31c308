//! Domain types for the roster directory store and its sync ledger.
//!
//! Enum variants are persisted as their lowercase wire names (see `as_str`),
//! which are also their serde names. Identifiers are `i64` row ids.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Row id of an `employee`.
    EmployeeId
);
row_id!(
    /// Row id of an `org_unit`.
    OrgUnitId
);
row_id!(
    /// Row id of a `sync_job`.
    JobId
);
row_id!(
    /// Row id of a `sync_record`.
    RecordId
);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Stable wire name, used in the database and on the CLI.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(UnknownVariant::new($kind, s)),
                }
            }
        }
    };
}

/// What started a sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Manual,
    Scheduled,
}

wire_enum!(Trigger, "trigger", { Manual => "manual", Scheduled => "scheduled" });

/// Lifecycle state of a sync job. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Partial,
    Error,
}

wire_enum!(JobStatus, "job status", {
    Running => "running",
    Success => "success",
    Partial => "partial",
    Error => "error",
});

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Intended action of a sync record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Archive,
}

wire_enum!(RecordAction, "record action", {
    Create => "create",
    Update => "update",
    Archive => "archive",
});

/// Outcome of a sync record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Applied,
    Error,
    Orphaned,
}

wire_enum!(RecordStatus, "record status", {
    Applied => "applied",
    Error => "error",
    Orphaned => "orphaned",
});

/// Reviewer decision on an orphaned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Keep,
    Archive,
}

wire_enum!(Decision, "decision", { Keep => "keep", Archive => "archive" });

/// Employment status. The sync engine only ever moves `Active -> Dismissed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Dismissed,
}

wire_enum!(EmployeeStatus, "employee status", {
    Active => "active",
    Dismissed => "dismissed",
});

/// Level of a node in the org-unit hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgUnitType {
    Group,
    Domain,
    LegalEntity,
    Department,
    Direction,
}

wire_enum!(OrgUnitType, "org unit type", {
    Group => "group",
    Domain => "domain",
    LegalEntity => "legal_entity",
    Department => "department",
    Direction => "direction",
});

/// Machine-readable code attached to an `error` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Legal-entity or department name absent from the descriptor.
    OrgUnitMissing,
    /// Both names present, but no matching non-archived department.
    OrgUnitNotFound,
    EmailMissing,
    DuplicateInBatch,
    /// Storage fault inside the record's savepoint.
    UpsertFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::OrgUnitMissing => "ORG_UNIT_MISSING",
            ErrorCode::OrgUnitNotFound => "ORG_UNIT_NOT_FOUND",
            ErrorCode::EmailMissing => "EMAIL_MISSING",
            ErrorCode::DuplicateInBatch => "DUPLICATE_IN_BATCH",
            ErrorCode::UpsertFailed => "UPSERT_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ORG_UNIT_MISSING" => Ok(ErrorCode::OrgUnitMissing),
            "ORG_UNIT_NOT_FOUND" => Ok(ErrorCode::OrgUnitNotFound),
            "EMAIL_MISSING" => Ok(ErrorCode::EmailMissing),
            "DUPLICATE_IN_BATCH" => Ok(ErrorCode::DuplicateInBatch),
            "UPSERT_FAILED" => Ok(ErrorCode::UpsertFailed),
            other => Err(UnknownVariant::new("error code", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync ledger
// ---------------------------------------------------------------------------

/// Aggregated counters of one job.
///
/// Every descriptor lands in exactly one of `created`, `updated`, `archived`,
/// `unchanged` or `errors`. The remaining counters are batch-level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSummary {
    pub created: u32,
    pub updated: u32,
    pub archived: u32,
    pub unchanged: u32,
    pub errors: u32,
    pub orphaned: u32,
    pub managers_linked: u32,
    pub managers_deferred: u32,
    /// Abort message; only set on jobs that failed outside a record scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSummary {
    /// Descriptors that changed local state.
    pub fn applied(&self) -> u32 {
        self.created + self.updated + self.archived
    }

    /// Descriptors accounted for by the per-descriptor counters.
    pub fn processed(&self) -> u32 {
        self.applied() + self.unchanged + self.errors
    }
}

/// One synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub trigger: Trigger,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: Option<JobSummary>,
}

/// Outcome for one external identity within one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub id: RecordId,
    pub job_id: JobId,
    /// Identity key: external_ref, or email when the source has none.
    pub external_ref: String,
    pub action: RecordAction,
    pub status: RecordStatus,
    pub error_code: Option<ErrorCode>,
    pub message: Option<String>,
    pub decision: Option<Decision>,
    pub decided_by: Option<EmployeeId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert form of [`SyncRecord`]; decision fields always start empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub job_id: JobId,
    pub external_ref: String,
    pub action: RecordAction,
    pub status: RecordStatus,
    pub error_code: Option<ErrorCode>,
    pub message: Option<String>,
}

impl NewRecord {
    pub fn applied(job_id: JobId, key: impl Into<String>, action: RecordAction) -> Self {
        Self {
            job_id,
            external_ref: key.into(),
            action,
            status: RecordStatus::Applied,
            error_code: None,
            message: None,
        }
    }

    pub fn failed(
        job_id: JobId,
        key: impl Into<String>,
        action: RecordAction,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            external_ref: key.into(),
            action,
            status: RecordStatus::Error,
            error_code: Some(code),
            message: Some(message.into()),
        }
    }

    pub fn orphaned(job_id: JobId, key: impl Into<String>) -> Self {
        Self {
            job_id,
            external_ref: key.into(),
            action: RecordAction::Archive,
            status: RecordStatus::Orphaned,
            error_code: None,
            message: Some("missing in source payload".to_owned()),
        }
    }
}

/// Immutable audit copy of one incoming descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub job_id: JobId,
    pub external_ref: String,
    pub payload: serde_json::Value,
    pub normalized: serde_json::Value,
    /// SHA-256 hex digest of `normalized`.
    pub digest: String,
    pub received_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// A locally stored employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub external_ref: Option<String>,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub title: String,
    pub status: EmployeeStatus,
    pub is_blocked: bool,
    pub manager_id: Option<EmployeeId>,
    pub org_unit_id: Option<OrgUnitId>,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// external_ref when set, email otherwise.
    pub fn identity_key(&self) -> &str {
        match self.external_ref.as_deref() {
            Some(r) if !r.is_empty() => r,
            _ => &self.email,
        }
    }
}

/// A node of the org-unit hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: OrgUnitId,
    pub parent_id: Option<OrgUnitId>,
    pub unit_type: OrgUnitType,
    pub name: String,
    pub is_archived: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
