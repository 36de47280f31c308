//! `sync_job` rows.
//!
//! A job is created `running` in autocommit mode, before the job's outer
//! transaction opens, so the row survives an aborted run. It moves to a
//! terminal status exactly once.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use roster_core::{Job, JobId, JobStatus, JobSummary, Trigger};

use crate::error::{not_found, StoreError};
use crate::wire_col;

/// Upper bound for [`list`].
pub const MAX_LIST_LIMIT: usize = 100;

const COLUMNS: &str = "id, triggered_by, status, started_at, finished_at, summary";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let summary: Option<String> = row.get(5)?;
    let summary = summary
        .map(|s| serde_json::from_str::<JobSummary>(&s))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(Job {
        id: JobId(row.get(0)?),
        trigger: wire_col::<Trigger>(row, 1)?,
        status: wire_col::<JobStatus>(row, 2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        summary,
    })
}

pub fn create(
    conn: &Connection,
    trigger: Trigger,
    started_at: DateTime<Utc>,
) -> Result<JobId, StoreError> {
    conn.execute(
        "INSERT INTO sync_job (triggered_by, status, started_at) VALUES (?1, 'running', ?2)",
        params![trigger.as_str(), started_at],
    )?;
    Ok(JobId(conn.last_insert_rowid()))
}

/// Move a running job to `status`. Fails with [`StoreError::JobFinished`] when
/// the job is already terminal.
pub fn finish(
    conn: &Connection,
    id: JobId,
    status: JobStatus,
    summary: &JobSummary,
    finished_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let summary = serde_json::to_string(summary)?;
    let n = conn.execute(
        "UPDATE sync_job SET status = ?2, summary = ?3, finished_at = ?4
          WHERE id = ?1 AND status = 'running'",
        params![id.0, status.as_str(), summary, finished_at],
    )?;
    if n == 0 {
        let current = get(conn, id)?;
        return Err(StoreError::JobFinished {
            id,
            status: current.status,
        });
    }
    Ok(())
}

pub fn get(conn: &Connection, id: JobId) -> Result<Job, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM sync_job WHERE id = ?1");
    conn.query_row(&sql, [id.0], map_row)
        .optional()?
        .ok_or_else(|| not_found("job", id.0))
}

/// Most recent jobs first. `limit` is clamped to `1..=MAX_LIST_LIMIT`.
pub fn list(conn: &Connection, limit: usize) -> Result<Vec<Job>, StoreError> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);
    let sql = format!("SELECT {COLUMNS} FROM sync_job ORDER BY id DESC LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([limit as i64], map_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn list_running(conn: &Connection) -> Result<Vec<Job>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM sync_job WHERE status = 'running' ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
