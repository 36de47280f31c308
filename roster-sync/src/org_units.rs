//! Department lookup for a descriptor's (legal entity, department) pair.
//! Read-only; missing units are never created.

use roster_core::{Descriptor, ErrorCode, OrgUnitId};
use roster_store::{org_units, Connection, StoreError};

use crate::error::RecordFailure;

/// Resolve the department of `descriptor`.
///
/// The outer `Result` carries storage faults; the inner one is the expected
/// per-record outcome.
pub fn resolve(
    conn: &Connection,
    descriptor: &Descriptor,
) -> Result<Result<OrgUnitId, RecordFailure>, StoreError> {
    let (Some(legal_entity), Some(department)) =
        (descriptor.company.as_deref(), descriptor.department.as_deref())
    else {
        let missing = match (&descriptor.company, &descriptor.department) {
            (None, None) => "legal entity and department",
            (None, Some(_)) => "legal entity",
            _ => "department",
        };
        return Ok(Err(RecordFailure::new(
            ErrorCode::OrgUnitMissing,
            format!("{missing} not given"),
        )));
    };

    Ok(org_units::find_department(conn, legal_entity, department)?.ok_or_else(|| {
        RecordFailure::new(
            ErrorCode::OrgUnitNotFound,
            format!("no department '{department}' under legal entity '{legal_entity}'"),
        )
    }))
}
