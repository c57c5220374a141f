//! Public and internal types shared by the report, pipeline and CLI layers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::document::{DigestAlgorithm, TextCharset};

/// Document metadata: unique keys, ordered for stable JSON output.
pub type Metadata = BTreeMap<String, String>;

/// Outcome of extracting one document. Exactly one status is stored per document Id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionStatus {
    Success,
    FailureNotFound,
    FailureNotReadable,
    FailureUnsupported,
    FailureRuntime,
    FailureInterrupted,
}

impl ExtractionStatus {
    pub const ALL: [ExtractionStatus; 6] = [
        ExtractionStatus::Success,
        ExtractionStatus::FailureNotFound,
        ExtractionStatus::FailureNotReadable,
        ExtractionStatus::FailureUnsupported,
        ExtractionStatus::FailureRuntime,
        ExtractionStatus::FailureInterrupted,
    ];

    /// Stable integer code written by persistent report stores.
    pub fn code(&self) -> i64 {
        match self {
            ExtractionStatus::Success => 0,
            ExtractionStatus::FailureNotFound => 1,
            ExtractionStatus::FailureNotReadable => 2,
            ExtractionStatus::FailureUnsupported => 3,
            ExtractionStatus::FailureRuntime => 4,
            ExtractionStatus::FailureInterrupted => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStatus::Success => "SUCCESS",
            ExtractionStatus::FailureNotFound => "FAILURE_NOT_FOUND",
            ExtractionStatus::FailureNotReadable => "FAILURE_NOT_READABLE",
            ExtractionStatus::FailureUnsupported => "FAILURE_UNSUPPORTED",
            ExtractionStatus::FailureRuntime => "FAILURE_RUNTIME",
            ExtractionStatus::FailureInterrupted => "FAILURE_INTERRUPTED",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionStatus::Success)
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExtractionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown extraction status: {s}"))
    }
}

/// Identity strategy used for report keys. Fixed for the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdentityKind {
    /// Normalized path string. No I/O.
    #[default]
    Path,
    /// Hex digest of the document bytes. Location independent.
    Digest,
}

impl FromStr for IdentityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(IdentityKind::Path),
            "digest" | "content" => Ok(IdentityKind::Digest),
            other => Err(anyhow::anyhow!("unknown identity strategy: {other}")),
        }
    }
}

/// Full options for a `spew` run (CLI, `.docbatch.toml` and lib callers).
#[derive(Clone, Debug)]
pub struct Opts {
    /// SQLite report file. When None, the report lives in memory and the run is not resumable.
    pub report_db: Option<PathBuf>,
    pub identity: IdentityKind,
    pub digest_algorithm: DigestAlgorithm,
    pub charset: TextCharset,
    /// Override worker thread count. When None, derived from rayon and the FD limit.
    pub num_threads: Option<usize>,
    /// Capacity of the document queue between scanner and workers.
    pub queue_capacity: usize,
    /// Directory receiving extracted text. When None, text is printed to stdout.
    pub output_dir: Option<PathBuf>,
    /// Also write each document's metadata as JSON next to its text.
    pub output_metadata: bool,
    pub follow_links: bool,
    /// Include dot-files and OS hidden files in the scan.
    pub include_hidden: bool,
    /// Exclude patterns (glob syntax).
    pub exclude: Vec<String>,
    pub max_depth: Option<usize>,
    /// Re-extract documents already recorded as SUCCESS.
    pub force: bool,
    /// Show progress bar and debug logs.
    pub verbose: bool,
    /// Seconds to wait for the worker pool to terminate once the queue is sealed.
    pub await_timeout_secs: u64,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            report_db: None,
            identity: IdentityKind::default(),
            digest_algorithm: DigestAlgorithm::default(),
            charset: TextCharset::default(),
            num_threads: None,
            queue_capacity: crate::utils::config::DEFAULT_QUEUE_CAPACITY,
            output_dir: None,
            output_metadata: false,
            follow_links: false,
            include_hidden: false,
            exclude: Vec::new(),
            max_depth: None,
            force: false,
            verbose: false,
            await_timeout_secs: crate::utils::config::DEFAULT_AWAIT_TIMEOUT_SECS,
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Paths enumerated by the scanner.
    pub scanned: usize,
    /// Documents skipped because the report already marked them SUCCESS.
    pub skipped: usize,
    /// Outcome counts for documents processed in this run.
    pub counts: BTreeMap<ExtractionStatus, usize>,
    /// The run was stopped by an interrupt before the queue was drained.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, status: ExtractionStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn failures(&self) -> usize {
        self.processed() - self.count(ExtractionStatus::Success)
    }
}
