//! docbatch CLI: extract a directory of documents, resumably; maintain the report.

use anyhow::Result;
use docbatch::engine::{Invocation, handle_run};
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let inv = Invocation::from_env();
    handle_run(&inv)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
