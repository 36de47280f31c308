//! Schema migrations, tracked with `PRAGMA user_version`.

use rusqlite::Connection;

use crate::error::StoreError;

/// Highest schema version this build knows how to use.
pub const SCHEMA_VERSION: u32 = 1;

const V1: &str = "
CREATE TABLE org_unit (
    id          INTEGER PRIMARY KEY,
    parent_id   INTEGER REFERENCES org_unit(id) ON DELETE SET NULL,
    unit_type   TEXT NOT NULL
                CHECK (unit_type IN ('group','domain','legal_entity','department','direction')),
    name        TEXT NOT NULL,
    is_archived INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX idx_org_unit_parent_id ON org_unit(parent_id);
CREATE INDEX idx_org_unit_type_name ON org_unit(unit_type, name);

CREATE TABLE employee (
    id            INTEGER PRIMARY KEY,
    external_ref  TEXT UNIQUE,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    first_name    TEXT NOT NULL,
    middle_name   TEXT,
    last_name     TEXT NOT NULL,
    title         TEXT NOT NULL DEFAULT '',
    status        TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active','dismissed')),
    is_blocked    INTEGER NOT NULL DEFAULT 0,
    manager_id    INTEGER REFERENCES employee(id) ON DELETE SET NULL,
    org_unit_id   INTEGER REFERENCES org_unit(id) ON DELETE SET NULL,
    password_hash TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX idx_employee_status ON employee(status);
CREATE INDEX idx_employee_manager_id ON employee(manager_id);

CREATE TABLE sync_job (
    id           INTEGER PRIMARY KEY,
    triggered_by TEXT NOT NULL CHECK (triggered_by IN ('manual','scheduled')),
    status       TEXT NOT NULL CHECK (status IN ('running','success','partial','error')),
    started_at   TEXT NOT NULL,
    finished_at  TEXT,
    summary      TEXT
);
CREATE INDEX idx_sync_job_status ON sync_job(status);

CREATE TABLE sync_record (
    id                     INTEGER PRIMARY KEY,
    job_id                 INTEGER NOT NULL REFERENCES sync_job(id) ON DELETE CASCADE,
    external_ref           TEXT NOT NULL,
    action                 TEXT NOT NULL CHECK (action IN ('create','update','archive')),
    status                 TEXT NOT NULL CHECK (status IN ('applied','error','orphaned')),
    error_code             TEXT,
    message                TEXT,
    decision               TEXT CHECK (decision IS NULL OR decision IN ('keep','archive')),
    decided_by_employee_id INTEGER REFERENCES employee(id) ON DELETE SET NULL,
    decided_at             TEXT,
    created_at             TEXT NOT NULL
);
CREATE INDEX idx_sync_record_job_id ON sync_record(job_id);
CREATE INDEX idx_sync_record_job_external ON sync_record(job_id, external_ref);

CREATE TABLE external_entity_snapshot (
    id           INTEGER PRIMARY KEY,
    job_id       INTEGER NOT NULL REFERENCES sync_job(id) ON DELETE CASCADE,
    external_ref TEXT NOT NULL,
    payload      TEXT NOT NULL,
    normalized   TEXT NOT NULL,
    digest       TEXT NOT NULL,
    received_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX uq_ees_job_external_ref ON external_entity_snapshot(job_id, external_ref);
CREATE INDEX idx_ees_external_ref_received ON external_entity_snapshot(external_ref, received_at);
";

/// Bring `conn` up to [`SCHEMA_VERSION`].
pub fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let found: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    if found < 1 {
        tx.execute_batch(V1)?;
    }
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    tracing::info!(from = found, to = SCHEMA_VERSION, "migrated database schema");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(err, StoreError::SchemaTooNew { .. }));
    }
}
