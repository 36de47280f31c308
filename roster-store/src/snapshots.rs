//! `external_entity_snapshot` rows: one immutable copy per descriptor and job.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde_json::Value;

use roster_core::{JobId, Snapshot};

use crate::error::StoreError;
use crate::json_col;

/// Insert form of [`Snapshot`].
#[derive(Debug, Clone, Copy)]
pub struct NewSnapshot<'a> {
    pub job_id: JobId,
    pub external_ref: &'a str,
    pub payload: &'a Value,
    pub normalized: &'a Value,
    pub digest: &'a str,
    pub received_at: DateTime<Utc>,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        job_id: JobId(row.get(1)?),
        external_ref: row.get(2)?,
        payload: json_col(row, 3)?,
        normalized: json_col(row, 4)?,
        digest: row.get(5)?,
        received_at: row.get(6)?,
    })
}

/// Fails on a second snapshot with the same key in the same job.
pub fn insert(conn: &Connection, snapshot: &NewSnapshot<'_>) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO external_entity_snapshot
                (job_id, external_ref, payload, normalized, digest, received_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            snapshot.job_id.0,
            snapshot.external_ref,
            serde_json::to_string(snapshot.payload)?,
            serde_json::to_string(snapshot.normalized)?,
            snapshot.digest,
            snapshot.received_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list(conn: &Connection, job_id: JobId) -> Result<Vec<Snapshot>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, job_id, external_ref, payload, normalized, digest, received_at
           FROM external_entity_snapshot
          WHERE job_id = ?1
          ORDER BY id",
    )?;
    let rows = stmt.query_map([job_id.0], map_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jobs, Store};
    use roster_core::Trigger;
    use serde_json::json;

    #[test]
    fn insert_then_list_preserves_payload() {
        let store = Store::in_memory().unwrap();
        let job = jobs::create(store.conn(), Trigger::Manual, Utc::now()).unwrap();
        let payload = json!({"email": " A@Corp.test ", "id": 7});
        let normalized = json!({"email": "a@corp.test", "external_ref": "7"});
        insert(
            store.conn(),
            &NewSnapshot {
                job_id: job,
                external_ref: "7",
                payload: &payload,
                normalized: &normalized,
                digest: "abc",
                received_at: Utc::now(),
            },
        )
        .unwrap();

        let rows = list(store.conn(), job).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payload, payload);
        assert_eq!(rows[0].normalized, normalized);
        assert_eq!(rows[0].digest, "abc");
    }

    #[test]
    fn same_key_twice_in_one_job_is_rejected() {
        let store = Store::in_memory().unwrap();
        let job = jobs::create(store.conn(), Trigger::Manual, Utc::now()).unwrap();
        let value = json!({});
        let snap = NewSnapshot {
            job_id: job,
            external_ref: "E1",
            payload: &value,
            normalized: &value,
            digest: "d",
            received_at: Utc::now(),
        };
        insert(store.conn(), &snap).unwrap();
        assert!(insert(store.conn(), &snap).is_err());

        let next = jobs::create(store.conn(), Trigger::Manual, Utc::now()).unwrap();
        insert(store.conn(), &NewSnapshot { job_id: next, ..snap }).unwrap();
    }
}
