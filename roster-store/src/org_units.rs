//! Org-unit hierarchy. The sync engine only reads it; seeding goes through
//! `roster org import`.

use rusqlite::{params, Connection, OptionalExtension, Row};

use roster_core::{OrgUnit, OrgUnitId, OrgUnitType};

use crate::error::StoreError;
use crate::wire_col;

fn map_row(row: &Row<'_>) -> rusqlite::Result<OrgUnit> {
    Ok(OrgUnit {
        id: OrgUnitId(row.get(0)?),
        parent_id: row.get::<_, Option<i64>>(1)?.map(OrgUnitId),
        unit_type: wire_col(row, 2)?,
        name: row.get(3)?,
        is_archived: row.get(4)?,
    })
}

/// The non-archived department named `department` whose parent is the
/// non-archived legal entity named `legal_entity`. Names match exactly.
pub fn find_department(
    conn: &Connection,
    legal_entity: &str,
    department: &str,
) -> Result<Option<OrgUnitId>, StoreError> {
    let id = conn
        .query_row(
            "SELECT d.id
               FROM org_unit d
               JOIN org_unit le ON le.id = d.parent_id
              WHERE d.unit_type = 'department' AND d.is_archived = 0 AND d.name = ?2
                AND le.unit_type = 'legal_entity' AND le.is_archived = 0 AND le.name = ?1
              ORDER BY d.id
              LIMIT 1",
            params![legal_entity, department],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(OrgUnitId))
}

pub fn insert(
    conn: &Connection,
    parent: Option<OrgUnitId>,
    unit_type: OrgUnitType,
    name: &str,
) -> Result<OrgUnitId, StoreError> {
    conn.execute(
        "INSERT INTO org_unit (parent_id, unit_type, name) VALUES (?1, ?2, ?3)",
        params![parent.map(|p| p.0), unit_type.as_str(), name],
    )?;
    Ok(OrgUnitId(conn.last_insert_rowid()))
}

/// Look up a unit by parent, type and name, inserting it when absent.
/// Returns the id and whether it was created.
pub fn ensure(
    conn: &Connection,
    parent: Option<OrgUnitId>,
    unit_type: OrgUnitType,
    name: &str,
) -> Result<(OrgUnitId, bool), StoreError> {
    let existing = conn
        .query_row(
            "SELECT id FROM org_unit
              WHERE parent_id IS ?1 AND unit_type = ?2 AND name = ?3
              ORDER BY id LIMIT 1",
            params![parent.map(|p| p.0), unit_type.as_str(), name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    match existing {
        Some(id) => Ok((OrgUnitId(id), false)),
        None => Ok((insert(conn, parent, unit_type, name)?, true)),
    }
}

pub fn set_archived(conn: &Connection, id: OrgUnitId, archived: bool) -> Result<(), StoreError> {
    let n = conn.execute(
        "UPDATE org_unit SET is_archived = ?2 WHERE id = ?1",
        params![id.0, archived],
    )?;
    if n == 0 {
        return Err(crate::error::not_found("org unit", id.0));
    }
    Ok(())
}

pub fn list(conn: &Connection) -> Result<Vec<OrgUnit>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, parent_id, unit_type, name, is_archived FROM org_unit ORDER BY id",
    )?;
    let rows = stmt.query_map([], map_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
