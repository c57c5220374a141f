//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    report_filename: String,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                report_filename: format!(".{pkg}.db"),
                config_filename: format!(".{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default report database name, created in the scanned directory.
    pub fn report_filename(&self) -> &str {
        &self.report_filename
    }

    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable name for `key`, e.g. `DOCBATCH_REPORT_DB`.
    pub fn env_var(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key)
    }

    /// Names never enqueued by the scanner (default report DB and its companions, config file).
    pub fn default_exclude_patterns(&self) -> Vec<String> {
        let mut names = vec![self.report_filename().to_string()];
        names.extend(
            SQLITE_COMPANION_SUFFIXES
                .iter()
                .map(|suffix| format!("{}{}", self.report_filename(), suffix)),
        );
        names.push(self.config_filename().to_string());
        names
    }
}

// ---- Worker threads ----

/// Thread limits for the consumer pool.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Minimum worker count.
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const FLOOR_THREADS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }
}

// ---- Progress ----

pub struct ProgressConsts;

impl ProgressConsts {
    /// The scanner re-hints the running total to listeners every this many paths.
    pub const SCAN_HINT_BATCH_SIZE: usize = 500;
}

// ---- Hashing ----

/// Hashing I/O thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which hashing uses memory-mapped I/O (bytes). 100 MB.
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Chunk size for reading files below mmap threshold (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

// ---- Extraction ----

/// Read chunk for the plain-text extractor; the cancel token is checked between chunks.
pub const EXTRACT_READ_CHUNK_SIZE: usize = 64 * 1024;

// ---- Queue / shutdown ----

/// Default bound of the scanner → worker document queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default wait for the consumer pool to terminate after the queue is sealed.
pub const DEFAULT_AWAIT_TIMEOUT_SECS: u64 = 60 * 60 * 24;

/// How long a parked worker or a blocked producer waits before re-checking cancellation.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ---- SQLite report ----

/// Files SQLite keeps beside a database, named `<db><suffix>`.
pub const SQLITE_COMPANION_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Wait this long on a locked report database (another process writing) before failing.
pub const REPORT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);
