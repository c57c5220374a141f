use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::Opts;
use crate::RunSummary;
use crate::concurrent::ExecutorProxy;
use crate::document::identifier_for;
use crate::engine::tools::{canonicalize_root, report_files};
use crate::extract::{Extractor, Spewer};
use crate::monitor::ListenerBus;
use crate::pipeline::{
    DocumentConsumer, DocumentQueue, ScanOptions, Scanner, check_for_fatal_error_or_skipped_paths,
};
use crate::report::{Reporter, open_report_map};
use crate::utils::fd_limit::resolve_worker_count;

/// Grace period for workers to notice cancellation after an interrupt or timeout.
const CANCEL_GRACE: Duration = Duration::from_secs(30);

/// Stops a running batch from another thread (e.g. a Ctrl+C handler).
#[derive(Clone)]
pub struct Interrupter {
    targets: Vec<Arc<dyn ExecutorProxy + Send + Sync>>,
    fired: Arc<AtomicBool>,
}

impl Interrupter {
    /// `shutdown_now` every component of the batch. Idempotent.
    pub fn interrupt(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            log::warn!("Interrupted; stopping workers");
        }
        for target in &self.targets {
            target.shutdown_now();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// One extraction batch over a directory: scanner → document queue → consumer pool → report.
pub struct Batch {
    root: PathBuf,
    opts: Opts,
    scanner: Arc<Scanner>,
    consumer: Arc<DocumentConsumer>,
    fired: Arc<AtomicBool>,
}

impl Batch {
    /// Canonicalize `root`, open the report and start (idle) scanner and consumer pools.
    pub fn new(
        root: &Path,
        opts: &Opts,
        extractor: Arc<dyn Extractor>,
        spewer: Arc<dyn Spewer>,
    ) -> Result<Self> {
        let root = canonicalize_root(root)?;
        let map = open_report_map(opts.report_db.as_deref()).with_context(|| match &opts.report_db {
            Some(p) => format!("open report {}", p.display()),
            None => "open in-memory report".to_string(),
        })?;
        let identifier = identifier_for(opts.identity, opts.digest_algorithm, opts.charset);
        debug!("Identity strategy: {}", identifier.name());
        let reporter = Reporter::new(map, identifier);

        let num_threads = resolve_worker_count(opts.num_threads);
        let consumer = Arc::new(DocumentConsumer::new(
            num_threads,
            reporter,
            extractor,
            spewer,
            !opts.force,
        )?);

        let report_files = opts
            .report_db
            .as_deref()
            .and_then(|p| p.canonicalize().ok())
            .map(|p| report_files(&p))
            .unwrap_or_default();
        let scan_options = ScanOptions {
            follow_links: opts.follow_links,
            include_hidden: opts.include_hidden,
            exclude: opts.exclude.clone(),
            max_depth: opts.max_depth,
            report_files,
        };
        let scanner = Arc::new(Scanner::new(scan_options, consumer.bus())?);

        Ok(Self {
            root,
            opts: opts.clone(),
            scanner,
            consumer,
            fired: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn num_threads(&self) -> usize {
        self.consumer.num_threads()
    }

    /// Listener registration for per-document progress and scanner total hints.
    pub fn monitor(&self) -> Arc<ListenerBus> {
        self.consumer.bus()
    }

    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            targets: vec![
                Arc::clone(&self.scanner) as Arc<dyn ExecutorProxy + Send + Sync>,
                Arc::clone(&self.consumer) as Arc<dyn ExecutorProxy + Send + Sync>,
            ],
            fired: Arc::clone(&self.fired),
        }
    }

    /// Scan, extract and record every document under the root; blocks until done.
    ///
    /// Report store failures abort the run and are returned. An interrupt is not an error here:
    /// the summary comes back with `interrupted` set.
    pub fn run(self) -> Result<RunSummary> {
        let queue = DocumentQueue::new(self.opts.queue_capacity);
        self.consumer.start(&queue)?;
        let count_rx = self.scanner.scan(&self.root, queue)?;

        // No more jobs for either pool; workers exit once the queue is sealed and drained.
        self.scanner.shutdown();
        self.consumer.shutdown();

        let timeout = Duration::from_secs(self.opts.await_timeout_secs);
        if !self.consumer.await_termination(timeout) {
            log::warn!(
                "Workers still running after {}s; cancelling",
                self.opts.await_timeout_secs
            );
            self.consumer.shutdown_now();
            if !self.consumer.await_termination(CANCEL_GRACE) {
                log::error!("Workers did not stop within {}s", CANCEL_GRACE.as_secs());
            }
        }
        // Workers gone before the walk finished: the producer could block on a full queue.
        if self.consumer.cancel_token().is_cancelled() {
            self.scanner.shutdown_now();
        }
        if !self.scanner.await_termination(CANCEL_GRACE) {
            log::error!("Scanner did not stop within {}s", CANCEL_GRACE.as_secs());
        }

        let mut summary = self.consumer.summary();
        summary.scanned = count_rx.try_recv().unwrap_or(0);
        summary.interrupted = self.fired.load(Ordering::Acquire);

        let fatal = self.consumer.take_fatal_error();
        if let Err(e) = self.consumer.close_report() {
            log::warn!("Closing report: {}", e);
        }
        check_for_fatal_error_or_skipped_paths(
            self.opts.verbose,
            fatal,
            &self.scanner.skipped_paths(),
        )?;
        debug!(
            "Batch done: scanned {}, processed {}, skipped {}",
            summary.scanned,
            summary.processed(),
            summary.skipped
        );
        Ok(summary)
    }
}
