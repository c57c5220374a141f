//! SQLite-backed report map. Survives process restarts and can be shared by several processes
//! (WAL journal + busy timeout).

use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ReportError, ReportMap};
use crate::ExtractionStatus;
use crate::utils::config::REPORT_BUSY_TIMEOUT;

/// WAL tuning pragmas. `synchronous = FULL`: a status is on disk before `put` returns.
const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = FULL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;
        "#;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    status INTEGER NOT NULL
);
"#;

const UPSERT_SQL: &str = "INSERT INTO reports (id, status) VALUES (?1, ?2)
     ON CONFLICT(id) DO UPDATE SET status = excluded.status";

pub struct SqliteReportMap {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<(), ReportError> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch(WAL_PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn decode_status(id: &str, code: i64) -> Result<ExtractionStatus, ReportError> {
    ExtractionStatus::from_code(code).ok_or_else(|| ReportError::UnknownStatus {
        id: id.to_string(),
        code,
    })
}

impl SqliteReportMap {
    /// Open or create the report database at `path`.
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(REPORT_BUSY_TIMEOUT)?;
        apply_wal_and_schema(&conn)?;
        log::debug!("Opened report database {}", path.display());
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database with the same schema (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, ReportError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the open connection, or fail with [`ReportError::Closed`].
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, ReportError>,
    ) -> Result<T, ReportError> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(ReportError::Closed)?;
        f(conn)
    }
}

fn select_status(conn: &Connection, id: &str) -> Result<Option<ExtractionStatus>, ReportError> {
    let code: Option<i64> = conn
        .query_row("SELECT status FROM reports WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    code.map(|c| decode_status(id, c)).transpose()
}

impl ReportMap for SqliteReportMap {
    fn put(
        &self,
        id: &str,
        status: ExtractionStatus,
    ) -> Result<Option<ExtractionStatus>, ReportError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let previous = select_status(&tx, id)?;
            tx.execute(UPSERT_SQL, params![id, status.code()])?;
            tx.commit()?;
            Ok(previous)
        })
    }

    fn get(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError> {
        self.with_conn(|conn| select_status(conn, id))
    }

    fn remove(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let previous = select_status(&tx, id)?;
            tx.execute("DELETE FROM reports WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(previous)
        })
    }

    fn contains(&self, id: &str) -> Result<bool, ReportError> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM reports WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn size(&self) -> Result<usize, ReportError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
            Ok(n.max(0) as usize)
        })
    }

    fn clear(&self) -> Result<(), ReportError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM reports", [])?;
            Ok(())
        })
    }

    fn entries(&self) -> Result<Vec<(String, ExtractionStatus)>, ReportError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, status FROM reports ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                let id: String = row.get(0)?;
                let code: i64 = row.get(1)?;
                Ok((id, code))
            })?;
            let mut all = Vec::new();
            for row in rows {
                let (id, code) = row?;
                let status = decode_status(&id, code)?;
                all.push((id, status));
            }
            Ok(all)
        })
    }

    fn close(&self) -> Result<(), ReportError> {
        let conn = self.lock().take();
        match conn {
            Some(conn) => {
                conn.close().map_err(|(_, e)| ReportError::Store(e))?;
                log::debug!("Closed report database");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for SqliteReportMap {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("closing report database: {}", e);
        }
    }
}
