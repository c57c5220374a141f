//! In-process report map. Lives as long as the process; used when no report database is configured.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{ReportError, ReportMap};
use crate::ExtractionStatus;

#[derive(Debug, Default)]
pub struct MemoryReportMap {
    entries: RwLock<HashMap<String, ExtractionStatus>>,
    closed: AtomicBool,
}

impl MemoryReportMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), ReportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ReportError::Closed);
        }
        Ok(())
    }
}

impl ReportMap for MemoryReportMap {
    fn put(
        &self,
        id: &str,
        status: ExtractionStatus,
    ) -> Result<Option<ExtractionStatus>, ReportError> {
        self.ensure_open()?;
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(map.insert(id.to_string(), status))
    }

    fn get(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError> {
        self.ensure_open()?;
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(id).copied())
    }

    fn remove(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError> {
        self.ensure_open()?;
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(map.remove(id))
    }

    fn size(&self) -> Result<usize, ReportError> {
        self.ensure_open()?;
        Ok(self.entries.read().unwrap_or_else(PoisonError::into_inner).len())
    }

    fn clear(&self) -> Result<(), ReportError> {
        self.ensure_open()?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, ExtractionStatus)>, ReportError> {
        self.ensure_open()?;
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }

    fn close(&self) -> Result<(), ReportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
