//! Document consumer: a fixed pool of workers that drain the document queue, extract each
//! document, record its status and notify listeners.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::context::DocumentQueue;
use super::drainer::drain_queue;
use crate::concurrent::{CancelToken, ExecutorProxy, ThreadPool};
use crate::document::Document;
use crate::extract::{Extractor, Spewer};
use crate::monitor::{Listener, ListenerBus, Monitorable};
use crate::report::{ReportError, Reporter};
use crate::{ExtractionStatus, RunSummary};

/// Metadata key carrying an embedded document's Id.
pub const EMBED_ID_KEY: &str = "Embed-Id";

/// State shared by every worker of one consumer.
struct ConsumerShared {
    reporter: Reporter,
    extractor: Arc<dyn Extractor>,
    spewer: Arc<dyn Spewer>,
    bus: Arc<ListenerBus>,
    stats: Mutex<RunSummary>,
    first_error: Mutex<Option<ReportError>>,
    skip_succeeded: bool,
    cancel: CancelToken,
}

impl ConsumerShared {
    fn record(&self, status: ExtractionStatus) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        *stats.counts.entry(status).or_insert(0) += 1;
    }

    fn record_skip(&self) {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .skipped += 1;
    }

    /// Keep the first fatal error and stop every worker.
    fn fail(&self, err: ReportError) {
        log::error!("Report store failure, stopping: {}", err);
        let mut first = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if first.is_none() {
            *first = Some(err);
        }
        drop(first);
        self.cancel.cancel();
    }

    /// Resolve, extract, record and notify one document. Only report store errors escape.
    fn process(&self, path: PathBuf, cancel: &CancelToken) -> Result<(), ReportError> {
        let mut document = Document::new(path);
        let detail = document.path().display().to_string();

        match self.reporter.status(&mut document) {
            Ok(Some(status)) if status.is_success() && self.skip_succeeded => {
                log::debug!("{}: already extracted, skipping", detail);
                self.record_skip();
                self.bus.notify_listeners(Some(&detail));
                return Ok(());
            }
            Ok(_) => {}
            Err(ReportError::Identity(e)) => {
                let status = e.status();
                log::debug!("{}: {} ({})", detail, status, e);
                self.reporter.save_unidentified(&document, status)?;
                self.record(status);
                self.bus.notify_listeners(Some(&detail));
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let status = self.extract(&mut document, cancel);
        if status == ExtractionStatus::FailureInterrupted {
            // Best effort: the store may already be going away.
            if let Err(e) = self.reporter.save(&mut document, status) {
                log::warn!("{}: could not record interruption: {}", detail, e);
            }
        } else {
            self.reporter.save(&mut document, status)?;
        }
        log::debug!("{}: {}", detail, status);
        self.record(status);
        self.bus.notify_listeners(Some(&detail));
        Ok(())
    }

    fn extract(&self, document: &mut Document, cancel: &CancelToken) -> ExtractionStatus {
        let mut extraction = match self.extractor.extract(document, cancel) {
            Ok(extraction) => extraction,
            Err(e) => {
                log::debug!("{}: {}", document.path().display(), e);
                return e.status();
            }
        };
        let identifier = Arc::clone(self.reporter.identifier());
        for embed in &mut extraction.embeds {
            match identifier.generate_for_embed(document, &embed.document) {
                Ok(id) => embed.document.set_metadata(EMBED_ID_KEY, id),
                Err(e) => log::warn!(
                    "{}: cannot identify embedded {}: {}",
                    document.path().display(),
                    embed.document.embed_path(),
                    e
                ),
            }
        }
        match self.spewer.write(document, &extraction) {
            Ok(()) => ExtractionStatus::Success,
            Err(e) => {
                log::warn!("{}: writing output failed: {}", document.path().display(), e);
                ExtractionStatus::FailureRuntime
            }
        }
    }
}

/// Worker pool side of a batch. Listeners registered on the consumer see one event per document.
pub struct DocumentConsumer {
    pool: ThreadPool,
    shared: Arc<ConsumerShared>,
}

impl DocumentConsumer {
    /// `skip_succeeded`: do not re-extract documents the report already marks SUCCESS.
    pub fn new(
        num_threads: usize,
        reporter: Reporter,
        extractor: Arc<dyn Extractor>,
        spewer: Arc<dyn Spewer>,
        skip_succeeded: bool,
    ) -> Result<Self> {
        let pool = ThreadPool::new("consumer", num_threads)?;
        let shared = Arc::new(ConsumerShared {
            reporter,
            extractor,
            spewer,
            bus: Arc::new(ListenerBus::new()),
            stats: Mutex::new(RunSummary::default()),
            first_error: Mutex::new(None),
            skip_succeeded,
            cancel: pool.cancel_token(),
        });
        Ok(Self { pool, shared })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.size()
    }

    /// Submit one drain job per worker. Each returns once `queue` is sealed and empty, or on cancel.
    pub fn start(&self, queue: &DocumentQueue) -> Result<()> {
        for _ in 0..self.pool.size() {
            let queue = queue.clone();
            let shared = Arc::clone(&self.shared);
            self.pool.execute(move |cancel| {
                let drained = drain_queue(&queue, cancel, |path| shared.process(path, cancel));
                match drained {
                    Ok(n) => log::debug!("Worker done after {} document(s)", n),
                    Err(e) => shared.fail(e),
                }
            })?;
        }
        Ok(())
    }

    /// The consumer's listener bus; also usable as the scanner's hint sink.
    pub fn bus(&self) -> Arc<ListenerBus> {
        Arc::clone(&self.shared.bus)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.pool.cancel_token()
    }

    /// First report store error raised by a worker, if any.
    pub fn take_fatal_error(&self) -> Option<ReportError> {
        self.shared
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn summary(&self) -> RunSummary {
        self.shared
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Close the report map once workers are done.
    pub fn close_report(&self) -> Result<(), ReportError> {
        self.shared.reporter.close()
    }
}

impl Monitorable for DocumentConsumer {
    fn add_listener(&self, listener: Arc<dyn Listener>) {
        self.shared.bus.add_listener(listener);
    }

    fn delete_listener(&self, listener: &Arc<dyn Listener>) -> bool {
        self.shared.bus.delete_listener(listener)
    }

    fn delete_listeners(&self) {
        self.shared.bus.delete_listeners();
    }

    fn count_listeners(&self) -> usize {
        self.shared.bus.count_listeners()
    }
}

impl ExecutorProxy for DocumentConsumer {
    fn shutdown(&self) {
        self.pool.shutdown();
    }

    fn shutdown_now(&self) {
        self.pool.shutdown_now();
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        self.pool.await_termination(timeout)
    }
}
