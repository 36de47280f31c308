//! Employee rows.

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use roster_core::{Employee, EmployeeId, EmployeeStatus, OrgUnitId};

use crate::error::{not_found, StoreError};
use crate::wire_col;

const COLUMNS: &str = "id, external_ref, email, first_name, middle_name, last_name, title, \
                       status, is_blocked, manager_id, org_unit_id, password_hash, \
                       created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: EmployeeId(row.get(0)?),
        external_ref: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        middle_name: row.get(4)?,
        last_name: row.get(5)?,
        title: row.get(6)?,
        status: wire_col(row, 7)?,
        is_blocked: row.get(8)?,
        manager_id: row.get::<_, Option<i64>>(9)?.map(EmployeeId),
        org_unit_id: row.get::<_, Option<i64>>(10)?.map(OrgUnitId),
        password_hash: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn find_one(
    conn: &Connection,
    clause: &str,
    value: &dyn ToSql,
) -> Result<Option<Employee>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM employee WHERE {clause}");
    Ok(conn.query_row(&sql, &[value], map_row).optional()?)
}

pub fn get(conn: &Connection, id: EmployeeId) -> Result<Employee, StoreError> {
    find_one(conn, "id = ?1", &id.0)?.ok_or_else(|| not_found("employee", id.0))
}

pub fn find_by_external_ref(
    conn: &Connection,
    external_ref: &str,
) -> Result<Option<Employee>, StoreError> {
    find_one(conn, "external_ref = ?1", &external_ref)
}

/// Case-insensitive email lookup.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Employee>, StoreError> {
    find_one(conn, "email = ?1 COLLATE NOCASE", &email)
}

pub fn list_active(conn: &Connection) -> Result<Vec<Employee>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM employee WHERE status = 'active' ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Insert form of [`Employee`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub external_ref: Option<String>,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub title: String,
    pub status: EmployeeStatus,
    pub is_blocked: bool,
    pub org_unit_id: Option<OrgUnitId>,
    pub password_hash: Option<String>,
}

pub fn insert(
    conn: &Connection,
    new: &NewEmployee,
    now: DateTime<Utc>,
) -> Result<EmployeeId, StoreError> {
    conn.execute(
        "INSERT INTO employee (external_ref, email, first_name, middle_name, last_name, title,
                               status, is_blocked, org_unit_id, password_hash,
                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            new.external_ref,
            new.email,
            new.first_name,
            new.middle_name,
            new.last_name,
            new.title,
            new.status.as_str(),
            new.is_blocked,
            new.org_unit_id.map(|u| u.0),
            new.password_hash,
            now,
        ],
    )?;
    Ok(EmployeeId(conn.last_insert_rowid()))
}

/// Columns to overwrite on an existing employee. `None` leaves a column as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeePatch {
    pub external_ref: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    /// `Some(None)` clears the column.
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub is_blocked: Option<bool>,
    pub org_unit_id: Option<OrgUnitId>,
    pub password_hash: Option<String>,
}

impl EmployeePatch {
    fn assignments(&self) -> Vec<(&'static str, Box<dyn ToSql + '_>)> {
        let mut out: Vec<(&'static str, Box<dyn ToSql + '_>)> = Vec::new();
        if let Some(v) = &self.external_ref {
            out.push(("external_ref", Box::new(v)));
        }
        if let Some(v) = &self.email {
            out.push(("email", Box::new(v)));
        }
        if let Some(v) = &self.first_name {
            out.push(("first_name", Box::new(v)));
        }
        if let Some(v) = &self.middle_name {
            out.push(("middle_name", Box::new(v)));
        }
        if let Some(v) = &self.last_name {
            out.push(("last_name", Box::new(v)));
        }
        if let Some(v) = &self.title {
            out.push(("title", Box::new(v)));
        }
        if let Some(v) = self.status {
            out.push(("status", Box::new(v.as_str())));
        }
        if let Some(v) = self.is_blocked {
            out.push(("is_blocked", Box::new(v)));
        }
        if let Some(v) = self.org_unit_id {
            out.push(("org_unit_id", Box::new(v.0)));
        }
        if let Some(v) = &self.password_hash {
            out.push(("password_hash", Box::new(v)));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Names of the columns this patch writes.
    pub fn columns(&self) -> Vec<&'static str> {
        self.assignments().into_iter().map(|(c, _)| c).collect()
    }
}

/// Write only the columns set in `patch`, bumping `updated_at`.
/// An empty patch touches nothing.
pub fn update(
    conn: &Connection,
    id: EmployeeId,
    patch: &EmployeePatch,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let assignments = patch.assignments();
    if assignments.is_empty() {
        return Ok(());
    }

    let mut sets = Vec::with_capacity(assignments.len() + 1);
    let mut values: Vec<Box<dyn ToSql + '_>> = Vec::with_capacity(assignments.len() + 2);
    for (column, value) in assignments {
        values.push(value);
        sets.push(format!("{column} = ?{}", values.len()));
    }
    values.push(Box::new(now));
    sets.push(format!("updated_at = ?{}", values.len()));
    values.push(Box::new(id.0));
    let sql = format!(
        "UPDATE employee SET {} WHERE id = ?{}",
        sets.join(", "),
        values.len()
    );

    let n = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    if n == 0 {
        return Err(not_found("employee", id.0));
    }
    Ok(())
}

pub fn set_manager(
    conn: &Connection,
    id: EmployeeId,
    manager: Option<EmployeeId>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let n = conn.execute(
        "UPDATE employee SET manager_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.0, manager.map(|m| m.0), now],
    )?;
    if n == 0 {
        return Err(not_found("employee", id.0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn new_employee(external_ref: Option<&str>, email: &str) -> NewEmployee {
        NewEmployee {
            external_ref: external_ref.map(str::to_owned),
            email: email.to_owned(),
            first_name: "Ada".into(),
            middle_name: None,
            last_name: "Lovelace".into(),
            title: String::new(),
            status: EmployeeStatus::Active,
            is_blocked: false,
            org_unit_id: None,
            password_hash: None,
        }
    }

    #[test]
    fn insert_and_find_by_both_keys() {
        let store = Store::in_memory().unwrap();
        let id = insert(store.conn(), &new_employee(Some("E1"), "ada@corp.test"), Utc::now())
            .unwrap();

        let by_ref = find_by_external_ref(store.conn(), "E1").unwrap().unwrap();
        assert_eq!(by_ref.id, id);
        let by_email = find_by_email(store.conn(), "ADA@corp.test").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert!(find_by_external_ref(store.conn(), "E2").unwrap().is_none());
    }

    #[test]
    fn email_is_unique_ignoring_case() {
        let store = Store::in_memory().unwrap();
        insert(store.conn(), &new_employee(None, "ada@corp.test"), Utc::now()).unwrap();
        let err = insert(store.conn(), &new_employee(None, "Ada@Corp.test"), Utc::now());
        assert!(matches!(err, Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn update_writes_only_patched_columns() {
        let store = Store::in_memory().unwrap();
        let created = Utc::now();
        let id = insert(store.conn(), &new_employee(Some("E1"), "ada@corp.test"), created)
            .unwrap();

        let patch = EmployeePatch {
            title: Some("Engineer".into()),
            status: Some(EmployeeStatus::Dismissed),
            ..Default::default()
        };
        assert_eq!(patch.columns(), vec!["title", "status"]);
        let later = created + chrono::Duration::seconds(5);
        update(store.conn(), id, &patch, later).unwrap();

        let emp = get(store.conn(), id).unwrap();
        assert_eq!(emp.title, "Engineer");
        assert_eq!(emp.status, EmployeeStatus::Dismissed);
        assert_eq!(emp.first_name, "Ada");
        assert_eq!(emp.updated_at, later);
    }

    #[test]
    fn empty_patch_does_not_bump_updated_at() {
        let store = Store::in_memory().unwrap();
        let created = Utc::now();
        let id = insert(store.conn(), &new_employee(Some("E1"), "ada@corp.test"), created)
            .unwrap();
        let patch = EmployeePatch::default();
        assert!(patch.is_empty());
        update(store.conn(), id, &patch, created + chrono::Duration::hours(1)).unwrap();
        assert_eq!(get(store.conn(), id).unwrap().updated_at, created);
    }

    #[test]
    fn middle_name_can_be_cleared() {
        let store = Store::in_memory().unwrap();
        let mut new = new_employee(Some("E1"), "ada@corp.test");
        new.middle_name = Some("King".into());
        let id = insert(store.conn(), &new, Utc::now()).unwrap();

        let patch = EmployeePatch {
            middle_name: Some(None),
            ..Default::default()
        };
        update(store.conn(), id, &patch, Utc::now()).unwrap();
        assert_eq!(get(store.conn(), id).unwrap().middle_name, None);
    }

    #[test]
    fn set_manager_and_list_active() {
        let store = Store::in_memory().unwrap();
        let boss = insert(store.conn(), &new_employee(Some("B"), "boss@corp.test"), Utc::now())
            .unwrap();
        let mut gone = new_employee(Some("G"), "gone@corp.test");
        gone.status = EmployeeStatus::Dismissed;
        insert(store.conn(), &gone, Utc::now()).unwrap();
        let sub = insert(store.conn(), &new_employee(Some("S"), "sub@corp.test"), Utc::now())
            .unwrap();

        set_manager(store.conn(), sub, Some(boss), Utc::now()).unwrap();
        assert_eq!(get(store.conn(), sub).unwrap().manager_id, Some(boss));

        let active: Vec<_> = list_active(store.conn())
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(active, vec![boss, sub]);
    }

    #[test]
    fn get_missing_employee_is_not_found() {
        let store = Store::in_memory().unwrap();
        let err = get(store.conn(), EmployeeId(404)).unwrap_err();
        assert_eq!(err.to_string(), "employee 404 not found");
    }
}
