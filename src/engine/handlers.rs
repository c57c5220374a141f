//! Task handlers: spew and the report maintenance tasks.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::arg_parser::{Invocation, default_report_path};
use crate::engine::tasks::opt;
use crate::engine::tools::canonicalize_root;
use crate::extract::{FileSpewer, PlainTextExtractor, Spewer, StdoutSpewer};
use crate::monitor::{Listener, LogListener, Monitorable, ProgressBarListener};
use crate::pipeline::Batch;
use crate::report::{ReportMap, SqliteReportMap, dump_entries, load_entries, status_counts};
use crate::utils::{Colors, apply_env_to_opts, apply_file_to_opts, load_docbatch_toml};
use crate::{ExtractionStatus, Opts, RunSummary};

/// Layer defaults → `.docbatch.toml` → environment → command line into the options for `spew`.
pub fn resolve_spew_opts(inv: &Invocation) -> Result<Opts> {
    let mut opts = Opts::default();
    if let Some(file) = load_docbatch_toml(&inv.dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_env_to_opts(&inv.dir, &mut opts);
    inv.apply_to_opts(&mut opts)?;
    if inv.flag(opt::MEMORY_REPORT) {
        opts.report_db = None;
    } else if opts.report_db.is_none() {
        opts.report_db = Some(default_report_path(&inv.dir));
    }
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);
    Ok(opts)
}

/// Create the output directory and keep the scanner out of it when it lies inside the root.
fn prepare_output_dir(root: &Path, output_dir: &Path, opts: &mut Opts) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir {}", output_dir.display()))?;
    let out = output_dir
        .canonicalize()
        .with_context(|| format!("canonicalize {}", output_dir.display()))?;
    if out.starts_with(root) {
        opts.exclude.push(out.display().to_string());
    }
    Ok(out)
}

/// Run a batch over `inv.dir`. Ctrl+C stops the workers; documents in flight are recorded as
/// interrupted and the command fails after printing the summary.
pub fn handle_spew(inv: &Invocation) -> Result<()> {
    let mut opts = resolve_spew_opts(inv)?;
    let root = canonicalize_root(&inv.dir)?;

    let spewer: Arc<dyn Spewer> = match opts.output_dir.clone() {
        Some(dir) => {
            let out = prepare_output_dir(&root, &dir, &mut opts)?;
            Arc::new(FileSpewer::new(&root, &out, opts.output_metadata))
        }
        None => Arc::new(StdoutSpewer),
    };

    let batch = Batch::new(&root, &opts, Arc::new(PlainTextExtractor), spewer)?;
    info!(
        "Extracting {} with {} worker(s)",
        batch.root().display(),
        batch.num_threads()
    );

    let interrupter = batch.interrupter();
    if let Err(e) = ctrlc::set_handler(move || interrupter.interrupt()) {
        warn!("Cannot install Ctrl+C handler: {}", e);
    }

    let monitor = batch.monitor();
    monitor.add_listener(Arc::new(LogListener::new()));
    // Text on stdout and a bar on stderr would interleave; only draw it when writing files.
    let progress = (opts.verbose && opts.output_dir.is_some() && io::stderr().is_terminal())
        .then(|| Arc::new(ProgressBarListener::new("Extracting")));
    if let Some(bar) = &progress {
        monitor.add_listener(Arc::clone(bar) as Arc<dyn Listener>);
    }

    let summary = batch.run()?;
    if let Some(bar) = &progress {
        bar.finish();
    }
    print_run_summary(&summary);
    if summary.interrupted {
        anyhow::bail!("interrupted");
    }
    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    eprintln!(
        "Scanned {} document(s), processed {}, {}",
        summary.scanned,
        summary.processed(),
        Colors::colorize(
            Colors::SKIPPED,
            &format!("skipped {} already extracted", summary.skipped)
        )
    );
    for (status, n) in &summary.counts {
        eprintln!(
            "  {:<22} {}",
            Colors::colorize(Colors::for_status(*status), status.name()),
            n
        );
    }
    if summary.failures() > 0 {
        warn!("{} document(s) failed", summary.failures());
    }
    if summary.interrupted {
        warn!(
            "Run interrupted; re-run to resume ({} in flight recorded as {})",
            summary.count(ExtractionStatus::FailureInterrupted),
            ExtractionStatus::FailureInterrupted
        );
    }
}

/// Open an existing report file; maintenance tasks never create one.
fn open_existing_report(inv: &Invocation) -> Result<SqliteReportMap> {
    let path = inv.report_path();
    if !path.is_file() {
        anyhow::bail!("no report at {}", path.display());
    }
    SqliteReportMap::open(&path).with_context(|| format!("open report {}", path.display()))
}

pub fn handle_dump_report(inv: &Invocation) -> Result<()> {
    let map = open_existing_report(inv)?;
    let n = match inv.path(opt::OUTPUT) {
        Some(out) => {
            let file = File::create(&out).with_context(|| format!("create {}", out.display()))?;
            let n = dump_entries(&map, BufWriter::new(file))?;
            info!("Wrote {} entries to {}", n, out.display());
            n
        }
        None => dump_entries(&map, io::stdout().lock())?,
    };
    debug!("Dumped {} entries", n);
    Ok(())
}

pub fn handle_load_report(inv: &Invocation) -> Result<()> {
    let input = inv
        .path(opt::INPUT)
        .context("load-report needs --input <PATH>")?;
    let path = inv.report_path();
    let map = SqliteReportMap::open(&path)
        .with_context(|| format!("open report {}", path.display()))?;
    let file = File::open(&input).with_context(|| format!("open {}", input.display()))?;
    let n = load_entries(&map, BufReader::new(file))?;
    info!("Loaded {} entries into {}", n, path.display());
    Ok(())
}

pub fn handle_wipe_report(inv: &Invocation) -> Result<()> {
    let map = open_existing_report(inv)?;
    let n = map.size()?;
    map.clear()?;
    info!("Removed {} entries from {}", n, inv.report_path().display());
    Ok(())
}

pub fn handle_summary(inv: &Invocation) -> Result<()> {
    let map = open_existing_report(inv)?;
    let counts = status_counts(&map)?;
    let total: usize = counts.values().sum();
    println!("{} entries in {}", total, inv.report_path().display());
    for (status, n) in counts {
        println!(
            "  {:<22} {}",
            Colors::colorize(Colors::for_status(status), status.name()),
            n
        );
    }
    Ok(())
}
