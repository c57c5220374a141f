//! Report map: persistent `Id → ExtractionStatus` store that makes runs resumable.
//!
//! Backends implement [`ReportMap`]; the [`Reporter`] resolves document Ids and writes through it.
//! Store errors are fatal to a run: a write that did not land would let a resumed run skip or
//! repeat the wrong documents.

mod dump;
mod memory;
mod reporter;
mod sqlite;

pub use dump::{DumpError, dump_entries, load_entries, status_counts};
pub use memory::MemoryReportMap;
pub use reporter::Reporter;
pub use sqlite::SqliteReportMap;

use std::path::Path;
use std::sync::Arc;

use crate::ExtractionStatus;
use crate::document::HashingError;

/// Errors from a report store or from resolving the Id a report entry is keyed by.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("report store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report map is closed")]
    Closed,
    #[error("unknown status code {code} stored for {id}")]
    UnknownStatus { id: String, code: i64 },
    /// The document's Id could not be computed. Local to that document.
    #[error("cannot identify document: {0}")]
    Identity(#[from] HashingError),
}

impl ReportError {
    /// True when the error concerns one document only and the run may continue.
    pub fn is_local(&self) -> bool {
        matches!(self, ReportError::Identity(_))
    }
}

/// Concurrent-safe `Id → status` store. Writes overwrite (last write wins); nothing expires.
///
/// Implementations synchronize internally: callers share one map across workers without locking.
/// `close` releases the backend's handles, is idempotent, and also runs on drop.
pub trait ReportMap: Send + Sync {
    /// Store `status` for `id`, returning the previous status.
    fn put(&self, id: &str, status: ExtractionStatus)
    -> Result<Option<ExtractionStatus>, ReportError>;

    fn get(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError>;

    /// Remove `id`, returning its status.
    fn remove(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError>;

    fn contains(&self, id: &str) -> Result<bool, ReportError> {
        Ok(self.get(id)?.is_some())
    }

    fn size(&self) -> Result<usize, ReportError>;

    fn clear(&self) -> Result<(), ReportError>;

    /// Every entry, sorted by Id.
    fn entries(&self) -> Result<Vec<(String, ExtractionStatus)>, ReportError>;

    fn close(&self) -> Result<(), ReportError>;
}

/// Open the report for a run: SQLite at `path`, or an in-memory map (not resumable) when None.
pub fn open_report_map(path: Option<&Path>) -> Result<Arc<dyn ReportMap>, ReportError> {
    match path {
        Some(p) => Ok(Arc::new(SqliteReportMap::open(p)?)),
        None => Ok(Arc::new(MemoryReportMap::new())),
    }
}
