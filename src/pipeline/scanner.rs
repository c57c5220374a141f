//! Scanner: walks a directory on its own thread and feeds file paths into the document queue.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use walkdir::WalkDir;

use super::context::{DocumentQueue, SealOnDrop};
use crate::concurrent::{CancelToken, ExecutorProxy, ThreadPool};
use crate::engine::tools::should_include_in_walk;
use crate::monitor::Listener;
use crate::utils::config::{PackagePaths, ProgressConsts};

/// Walk filters.
#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
    pub follow_links: bool,
    pub include_hidden: bool,
    pub exclude: Vec<String>,
    pub max_depth: Option<usize>,
    /// Canonical report database and companion paths; never enqueued.
    pub report_files: Vec<PathBuf>,
}

/// One result from a directory walk: either a file to enqueue or an error with optional path.
pub enum WalkOutcome {
    File(PathBuf),
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`]; directories and other non-files yield `None`.
pub fn to_outcome_walkdir(r: walkdir::Result<walkdir::DirEntry>) -> Option<WalkOutcome> {
    match r {
        Ok(entry) if entry.file_type().is_file() => Some(WalkOutcome::File(entry.into_path())),
        Ok(_) => None,
        Err(err) => Some(WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        }),
    }
}

/// Paths the walk could not read, with the error message.
pub type SkippedPaths = Arc<Mutex<Vec<(PathBuf, String)>>>;

pub struct Scanner {
    pool: ThreadPool,
    options: ScanOptions,
    hints: Arc<dyn Listener>,
    skipped_paths: SkippedPaths,
}

impl Scanner {
    /// `hints` receives the running and final path count (total-step hints for progress listeners).
    pub fn new(options: ScanOptions, hints: Arc<dyn Listener>) -> Result<Self> {
        let mut options = options;
        options
            .exclude
            .extend(PackagePaths::get().default_exclude_patterns());
        Ok(Self {
            pool: ThreadPool::new("scanner", 1)?,
            options,
            hints,
            skipped_paths: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.pool.cancel_token()
    }

    /// Start walking `root`. The returned receiver yields the number of paths enqueued once the
    /// walk ends.
    /// The queue is sealed when the walk ends, is cancelled, or never gets to run.
    pub fn scan(&self, root: &Path, queue: DocumentQueue) -> Result<Receiver<usize>> {
        let (count_tx, count_rx) = bounded::<usize>(1);
        let root = root.to_path_buf();
        let options = self.options.clone();
        let hints = Arc::clone(&self.hints);
        let skipped = Arc::clone(&self.skipped_paths);
        let guard = SealOnDrop(queue);
        self.pool.execute(move |cancel| {
            let guard = guard;
            let walk = walk_iter(&root, &options);
            run_walk_loop(&guard.0, count_tx, walk, cancel, hints.as_ref(), &skipped);
        })?;
        Ok(count_rx)
    }

    pub fn skipped_paths(&self) -> Vec<(PathBuf, String)> {
        self.skipped_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExecutorProxy for Scanner {
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

fn walk_iter(root: &Path, options: &ScanOptions) -> impl Iterator<Item = WalkOutcome> {
    let mut walk = WalkDir::new(root).follow_links(options.follow_links);
    if let Some(depth) = options.max_depth {
        walk = walk.max_depth(depth);
    }
    let filter_root = root.to_path_buf();
    let filter_options = options.clone();
    walk.into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || should_include_in_walk(
                    entry.path(),
                    &filter_root,
                    &filter_options.report_files,
                    &filter_options.exclude,
                    filter_options.include_hidden,
                )
        })
        .filter_map(to_outcome_walkdir)
}

/// Consume `iter`, enqueue files, and record walk errors in `skipped`.
/// Hints the running count every [`ProgressConsts::SCAN_HINT_BATCH_SIZE`] paths and the final
/// count at the end.
/// Sends the total on `count_tx`. Returns the count of paths enqueued.
pub fn run_walk_loop<I>(
    queue: &DocumentQueue,
    count_tx: Sender<usize>,
    iter: I,
    cancel: &CancelToken,
    hints: &dyn Listener,
    skipped: &SkippedPaths,
) -> usize
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut count = 0_usize;
    for outcome in iter {
        match outcome {
            WalkOutcome::File(path) => {
                if !queue.put(path, cancel) {
                    log::debug!("Scan cancelled after {} path(s)", count);
                    break;
                }
                count += 1;
                if count.is_multiple_of(ProgressConsts::SCAN_HINT_BATCH_SIZE) {
                    hints.hint_remaining(count);
                }
            }
            WalkOutcome::Err { msg, path } => {
                log::warn!("Cannot access path: {}", msg);
                let path = path.unwrap_or_else(|| PathBuf::from("<no-path>"));
                skipped
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((path, msg));
            }
        }
    }
    hints.hint_remaining(count);
    queue.seal();
    let _ = count_tx.send(count);
    log::debug!("Scan finished: {} path(s) queued", count);
    count
}
