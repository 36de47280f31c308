//! Create-or-update of one employee per descriptor, with field-level change
//! detection.
//!
//! Match order: `external_ref`, then email. On a match only differing columns
//! are written; when nothing differs the row is not touched at all.
//! Dismissal is one-way: a blocked descriptor dismisses and blocks the
//! employee, an unblocked one never reactivates it.

use chrono::{DateTime, Utc};

use roster_core::{Descriptor, Employee, EmployeeId, EmployeeStatus, OrgUnitId, RecordAction};
use roster_store::employees::{self, EmployeePatch, NewEmployee};
use roster_store::{Connection, StoreError};

use crate::credential::CredentialHasher;

/// What an upsert did to the employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Updated,
    /// Moved to `dismissed`, either on update or as a new hire.
    Dismissed,
    Unchanged,
}

impl Change {
    /// Action of the `applied` record; `None` for no-ops, which get no record.
    pub fn action(self) -> Option<RecordAction> {
        match self {
            Change::Created => Some(RecordAction::Create),
            Change::Updated => Some(RecordAction::Update),
            Change::Dismissed => Some(RecordAction::Archive),
            Change::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub employee_id: EmployeeId,
    pub change: Change,
}

/// The stored employee `descriptor` refers to, if any.
pub fn find_existing(
    conn: &Connection,
    descriptor: &Descriptor,
) -> Result<Option<Employee>, StoreError> {
    if let Some(external_ref) = descriptor.external_ref.as_deref() {
        if let Some(found) = employees::find_by_external_ref(conn, external_ref)? {
            return Ok(Some(found));
        }
    }
    if descriptor.email.is_empty() {
        return Ok(None);
    }
    employees::find_by_email(conn, &descriptor.email)
}

/// `update` when a match exists, `create` otherwise.
pub fn intended_action(conn: &Connection, descriptor: &Descriptor) -> Result<RecordAction, StoreError> {
    Ok(match find_existing(conn, descriptor)? {
        Some(_) => RecordAction::Update,
        None => RecordAction::Create,
    })
}

pub fn upsert(
    conn: &Connection,
    descriptor: &Descriptor,
    department: OrgUnitId,
    hasher: &dyn CredentialHasher,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome, StoreError> {
    let Some(existing) = find_existing(conn, descriptor)? else {
        let blocked = descriptor.is_blocked();
        let new = NewEmployee {
            external_ref: descriptor.external_ref.clone(),
            email: descriptor.email.clone(),
            first_name: descriptor.first_name.clone(),
            middle_name: descriptor.middle_name.clone(),
            last_name: descriptor.last_name.clone(),
            title: descriptor.title.clone().unwrap_or_default(),
            status: if blocked {
                EmployeeStatus::Dismissed
            } else {
                EmployeeStatus::Active
            },
            is_blocked: blocked,
            org_unit_id: Some(department),
            password_hash: descriptor
                .password_hash
                .as_deref()
                .map(|h| hasher.stored_hash(h))
                .filter(|h| !h.is_empty()),
        };
        let employee_id = employees::insert(conn, &new, now)?;
        return Ok(UpsertOutcome {
            employee_id,
            change: if blocked { Change::Dismissed } else { Change::Created },
        });
    };

    let patch = diff(&existing, descriptor, department, hasher);
    let change = if patch.is_empty() {
        Change::Unchanged
    } else if patch.status == Some(EmployeeStatus::Dismissed) {
        Change::Dismissed
    } else {
        Change::Updated
    };
    if change != Change::Unchanged {
        tracing::debug!(employee_id = %existing.id, columns = ?patch.columns(), "updating employee");
        employees::update(conn, existing.id, &patch, now)?;
    }
    Ok(UpsertOutcome {
        employee_id: existing.id,
        change,
    })
}

/// Columns of `existing` that `descriptor` changes. Pure.
pub fn diff(
    existing: &Employee,
    descriptor: &Descriptor,
    department: OrgUnitId,
    hasher: &dyn CredentialHasher,
) -> EmployeePatch {
    let mut patch = EmployeePatch::default();

    if existing.external_ref.is_none() {
        patch.external_ref = descriptor.external_ref.clone();
    }
    if !descriptor.email.is_empty() && existing.email.to_lowercase() != descriptor.email {
        patch.email = Some(descriptor.email.clone());
    }
    if existing.first_name != descriptor.first_name {
        patch.first_name = Some(descriptor.first_name.clone());
    }
    if existing.middle_name != descriptor.middle_name {
        patch.middle_name = Some(descriptor.middle_name.clone());
    }
    if existing.last_name != descriptor.last_name {
        patch.last_name = Some(descriptor.last_name.clone());
    }
    let title = descriptor.title.as_deref().unwrap_or_default();
    if existing.title != title {
        patch.title = Some(title.to_owned());
    }
    if existing.org_unit_id != Some(department) {
        patch.org_unit_id = Some(department);
    }
    if let Some(incoming) = descriptor.password_hash.as_deref() {
        let stored = hasher.stored_hash(incoming);
        if !stored.is_empty() && existing.password_hash.as_deref() != Some(stored.as_str()) {
            patch.password_hash = Some(stored);
        }
    }
    if descriptor.is_blocked() {
        if existing.status != EmployeeStatus::Dismissed {
            patch.status = Some(EmployeeStatus::Dismissed);
        }
        if !existing.is_blocked {
            patch.is_blocked = Some(true);
        }
    }
    patch
}
