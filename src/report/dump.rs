//! JSON import/export of report entries: `{ "<id>": "<STATUS>", ... }`.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::{ReportError, ReportMap};
use crate::ExtractionStatus;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("report JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("report JSON I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Write every entry of `map` to `out` as a pretty JSON object. Returns the number written.
pub fn dump_entries<W: Write>(map: &dyn ReportMap, mut out: W) -> Result<usize, DumpError> {
    let entries: BTreeMap<String, ExtractionStatus> = map.entries()?.into_iter().collect();
    serde_json::to_writer_pretty(&mut out, &entries)?;
    writeln!(out)?;
    out.flush()?;
    Ok(entries.len())
}

/// Read a JSON object from `input` and `put` every entry into `map`. Returns the number loaded.
pub fn load_entries<R: Read>(map: &dyn ReportMap, input: R) -> Result<usize, DumpError> {
    let entries: BTreeMap<String, ExtractionStatus> = serde_json::from_reader(input)?;
    for (id, status) in &entries {
        map.put(id, *status)?;
    }
    Ok(entries.len())
}

/// Number of entries per status (zero counts included).
pub fn status_counts(
    map: &dyn ReportMap,
) -> Result<BTreeMap<ExtractionStatus, usize>, ReportError> {
    let mut counts: BTreeMap<ExtractionStatus, usize> =
        ExtractionStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    for (_, status) in map.entries()? {
        *counts.entry(status).or_insert(0) += 1;
    }
    Ok(counts)
}
