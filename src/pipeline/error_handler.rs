use anyhow::Result;
use std::path::PathBuf;

use crate::report::ReportError;

/// Check batch result after workers and scanner have stopped: a report store failure fails the
/// run; paths the walk could not read are logged.
pub fn check_for_fatal_error_or_skipped_paths(
    verbose: bool,
    fatal: Option<ReportError>,
    skipped_paths: &[(PathBuf, String)],
) -> Result<()> {
    if let Some(err) = fatal {
        return Err(anyhow::Error::new(err).context("report store failed; run aborted"));
    }
    if !skipped_paths.is_empty() {
        log::warn!(
            "Skipped {} paths due to permission errors or access issues",
            skipped_paths.len()
        );
        if verbose {
            for (p, msg) in skipped_paths {
                eprintln!("  skipped: {} ({})", p.display(), msg);
            }
        }
    }
    Ok(())
}
