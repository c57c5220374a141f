use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ReportError, ReportMap};
use crate::ExtractionStatus;
use crate::document::{Document, DocumentIdentifier};
use crate::engine::tools::path_to_id_string;

/// Records document outcomes in a report map, keyed by the run's identity strategy.
///
/// The reporter does not own the map's lifecycle beyond closing it once, either through
/// [`Reporter::close`] or on drop.
pub struct Reporter {
    map: Arc<dyn ReportMap>,
    identifier: Arc<dyn DocumentIdentifier>,
    closed: AtomicBool,
}

impl Reporter {
    pub fn new(map: Arc<dyn ReportMap>, identifier: Arc<dyn DocumentIdentifier>) -> Self {
        Self {
            map,
            identifier,
            closed: AtomicBool::new(false),
        }
    }

    pub fn identifier(&self) -> &Arc<dyn DocumentIdentifier> {
        &self.identifier
    }

    pub fn map(&self) -> &Arc<dyn ReportMap> {
        &self.map
    }

    /// Write `status` for `document`, replacing any earlier status.
    pub fn save(
        &self,
        document: &mut Document,
        status: ExtractionStatus,
    ) -> Result<(), ReportError> {
        let id = self.identifier.generate(document)?;
        self.map.put(&id, status)?;
        Ok(())
    }

    /// True if the stored status for `document` equals `status`.
    pub fn check(
        &self,
        document: &mut Document,
        status: ExtractionStatus,
    ) -> Result<bool, ReportError> {
        let id = self.identifier.generate(document)?;
        Ok(self.map.get(&id)? == Some(status))
    }

    /// Stored status for `document`, if any.
    pub fn status(&self, document: &mut Document) -> Result<Option<ExtractionStatus>, ReportError> {
        let id = self.identifier.generate(document)?;
        self.map.get(&id)
    }

    /// Record a failure for a document whose Id could not be computed.
    ///
    /// Keyed by the normalized path: a later run that can identify the document will look it up
    /// under its real Id, find nothing, and process it again.
    pub fn save_unidentified(
        &self,
        document: &Document,
        status: ExtractionStatus,
    ) -> Result<(), ReportError> {
        self.map.put(&path_to_id_string(document.path()), status)?;
        Ok(())
    }

    /// Close the wrapped report map. Only the first call releases it.
    pub fn close(&self) -> Result<(), ReportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.map.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("closing report map: {}", e);
        }
    }
}
