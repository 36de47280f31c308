//! roster-store: SQLite persistence for the employee directory and the sync
//! ledger.
//!
//! Repositories are free functions over `&Connection`, so the same call works
//! on the bare connection, inside a [`UnitOfWork`], or inside a
//! [`RecordScope`].

pub mod employees;
pub mod error;
pub mod jobs;
pub mod org_units;
pub mod records;
pub mod schema;
pub mod snapshots;

use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Row, Savepoint, Transaction};

use roster_core::UnknownVariant;

pub use error::StoreError;
pub use rusqlite::Connection;
pub use records::RecordFilter;

/// Owner of the single SQLite connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::init(conn)
    }

    /// A private in-memory database; used by tests and dry runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        schema::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Autocommit access, for reads and single-statement writes.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start the outer transaction of a job.
    pub fn begin(&mut self) -> Result<UnitOfWork<'_>, StoreError> {
        Ok(UnitOfWork {
            tx: self.conn.transaction()?,
        })
    }
}

/// Outer transaction of one job. Dropping it without [`commit`](Self::commit)
/// rolls everything back.
pub struct UnitOfWork<'c> {
    tx: Transaction<'c>,
}

impl<'c> UnitOfWork<'c> {
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    /// Open a savepoint for one record.
    pub fn scope(&mut self) -> Result<RecordScope<'_>, StoreError> {
        Ok(RecordScope {
            sp: self.tx.savepoint()?,
        })
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback()?;
        Ok(())
    }
}

/// Savepoint around one descriptor. Rolling back discards only this record's
/// writes; the enclosing [`UnitOfWork`] stays usable.
pub struct RecordScope<'u> {
    sp: Savepoint<'u>,
}

impl<'u> RecordScope<'u> {
    pub fn conn(&self) -> &Connection {
        &self.sp
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.sp.commit()?;
        Ok(())
    }

    /// `ROLLBACK TO` followed by `RELEASE`, leaving no savepoint behind.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.sp.rollback()?;
        self.sp.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

/// Read a TEXT column holding a wire name.
pub(crate) fn wire_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_wire_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Read a TEXT column holding JSON.
pub(crate) fn json_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
