//! `sync_record` rows and reviewer decisions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use roster_core::{
    Decision, EmployeeId, JobId, NewRecord, RecordAction, RecordId, RecordStatus, SyncRecord,
};

use crate::error::{not_found, StoreError};
use crate::{opt_wire_col, wire_col};

const COLUMNS: &str = "id, job_id, external_ref, action, status, error_code, message, \
                       decision, decided_by_employee_id, decided_at, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<SyncRecord> {
    Ok(SyncRecord {
        id: RecordId(row.get(0)?),
        job_id: JobId(row.get(1)?),
        external_ref: row.get(2)?,
        action: wire_col(row, 3)?,
        status: wire_col(row, 4)?,
        error_code: opt_wire_col(row, 5)?,
        message: row.get(6)?,
        decision: opt_wire_col(row, 7)?,
        decided_by: row.get::<_, Option<i64>>(8)?.map(EmployeeId),
        decided_at: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Optional narrowing for [`list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub action: Option<RecordAction>,
    pub status: Option<RecordStatus>,
}

pub fn insert(
    conn: &Connection,
    record: &NewRecord,
    now: DateTime<Utc>,
) -> Result<RecordId, StoreError> {
    conn.execute(
        "INSERT INTO sync_record (job_id, external_ref, action, status, error_code, message,
                                  created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.job_id.0,
            record.external_ref,
            record.action.as_str(),
            record.status.as_str(),
            record.error_code.map(|c| c.as_str()),
            record.message,
            now,
        ],
    )?;
    Ok(RecordId(conn.last_insert_rowid()))
}

pub fn get(conn: &Connection, id: RecordId) -> Result<SyncRecord, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM sync_record WHERE id = ?1");
    conn.query_row(&sql, [id.0], map_row)
        .optional()?
        .ok_or_else(|| not_found("record", id.0))
}

/// Records of one job in insertion order.
pub fn list(
    conn: &Connection,
    job_id: JobId,
    filter: RecordFilter,
) -> Result<Vec<SyncRecord>, StoreError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM sync_record
          WHERE job_id = ?1
            AND (?2 IS NULL OR action = ?2)
            AND (?3 IS NULL OR status = ?3)
          ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            job_id.0,
            filter.action.map(|a| a.as_str()),
            filter.status.map(|s| s.as_str()),
        ],
        map_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Record a reviewer decision on an orphaned record. The employee itself is
/// left untouched. A later decision replaces an earlier one.
pub fn decide(
    conn: &Connection,
    id: RecordId,
    decision: Decision,
    decided_by: EmployeeId,
    now: DateTime<Utc>,
) -> Result<SyncRecord, StoreError> {
    let record = get(conn, id)?;
    if record.status != RecordStatus::Orphaned {
        return Err(StoreError::NotDecidable {
            id,
            status: record.status,
        });
    }
    crate::employees::get(conn, decided_by)?;
    conn.execute(
        "UPDATE sync_record
            SET decision = ?2, decided_by_employee_id = ?3, decided_at = ?4
          WHERE id = ?1",
        params![id.0, decision.as_str(), decided_by.0, now],
    )?;
    get(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employees::{self, NewEmployee};
    use crate::{jobs, Store};
    use roster_core::{EmployeeStatus, ErrorCode, Trigger};

    fn reviewer(conn: &Connection) -> EmployeeId {
        employees::insert(
            conn,
            &NewEmployee {
                external_ref: Some("HR1".into()),
                email: "hr@corp.test".into(),
                first_name: "Hal".into(),
                middle_name: None,
                last_name: "Reyes".into(),
                title: String::new(),
                status: EmployeeStatus::Active,
                is_blocked: false,
                org_unit_id: None,
                password_hash: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn seeded() -> (Store, JobId) {
        let store = Store::in_memory().unwrap();
        let job = jobs::create(store.conn(), Trigger::Manual, Utc::now()).unwrap();
        let now = Utc::now();
        insert(store.conn(), &NewRecord::applied(job, "E1", RecordAction::Create), now).unwrap();
        insert(
            store.conn(),
            &NewRecord::failed(
                job,
                "E2",
                RecordAction::Create,
                ErrorCode::OrgUnitNotFound,
                "no such department",
            ),
            now,
        )
        .unwrap();
        insert(store.conn(), &NewRecord::orphaned(job, "E3"), now).unwrap();
        (store, job)
    }

    #[test]
    fn list_filters_by_action_and_status() {
        let (store, job) = seeded();
        assert_eq!(list(store.conn(), job, RecordFilter::default()).unwrap().len(), 3);

        let created = list(
            store.conn(),
            job,
            RecordFilter {
                action: Some(RecordAction::Create),
                status: None,
            },
        )
        .unwrap();
        assert_eq!(created.len(), 2);

        let errors = list(
            store.conn(),
            job,
            RecordFilter {
                action: Some(RecordAction::Create),
                status: Some(RecordStatus::Error),
            },
        )
        .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].external_ref, "E2");
        assert_eq!(errors[0].error_code, Some(ErrorCode::OrgUnitNotFound));
    }

    #[test]
    fn decide_sets_decision_on_orphaned_record() {
        let (store, job) = seeded();
        let by = reviewer(store.conn());
        let orphan = list(
            store.conn(),
            job,
            RecordFilter {
                action: None,
                status: Some(RecordStatus::Orphaned),
            },
        )
        .unwrap()
        .remove(0);

        let decided = decide(store.conn(), orphan.id, Decision::Keep, by, Utc::now()).unwrap();
        assert_eq!(decided.decision, Some(Decision::Keep));
        assert_eq!(decided.decided_by, Some(by));
        assert!(decided.decided_at.is_some());
        assert_eq!(decided.status, RecordStatus::Orphaned);
    }

    #[test]
    fn decide_rejects_non_orphaned_record() {
        let (store, job) = seeded();
        let by = reviewer(store.conn());
        let applied = list(store.conn(), job, RecordFilter::default()).unwrap().remove(0);
        let err = decide(store.conn(), applied.id, Decision::Archive, by, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotDecidable {
                status: RecordStatus::Applied,
                ..
            }
        ));
    }

    #[test]
    fn decide_requires_known_reviewer() {
        let (store, job) = seeded();
        let orphan = list(store.conn(), job, RecordFilter::default()).unwrap().remove(2);
        let err =
            decide(store.conn(), orphan.id, Decision::Keep, EmployeeId(77), Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "employee", .. }));
    }
}
