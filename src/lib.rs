//! docbatch: resumable batch document extraction.
//!
//! A scanner walks a directory and feeds paths into a bounded queue; a pool of workers drains
//! it, extracts each document and records its outcome in a report map keyed by document
//! identity. A later run over the same report skips documents already extracted.

pub mod concurrent;
pub mod document;
pub mod engine;
pub mod extract;
pub mod monitor;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use std::path::Path;
use std::sync::Arc;

use extract::{Extractor, Spewer};

/// Result alias used by public docbatch API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: extract every document under `root` with `opts` and return the run summary.
///
/// `opts.report_db: None` keeps the report in memory (nothing to resume from). Register progress
/// listeners or install an interrupt handler by building a [`pipeline::Batch`] directly instead.
///
/// ```ignore
/// let opts = docbatch::Opts { report_db: Some(".docbatch.db".into()), ..Default::default() };
/// let summary = docbatch::spew_dir(
///     path,
///     &opts,
///     Arc::new(docbatch::extract::PlainTextExtractor),
///     Arc::new(docbatch::extract::StdoutSpewer),
/// )?;
/// ```
pub fn spew_dir(
    root: &Path,
    opts: &Opts,
    extractor: Arc<dyn Extractor>,
    spewer: Arc<dyn Spewer>,
) -> Result<RunSummary> {
    log::debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    pipeline::Batch::new(root, opts, extractor, spewer)?.run()
}
