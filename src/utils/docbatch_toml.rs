//! Layered configuration for `spew`: `.docbatch.toml` in the scanned directory, then
//! `DOCBATCH_*` environment variables (a `.env` file is loaded first). CLI flags are applied last by the caller.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct DocbatchToml {
    #[serde(default)]
    settings: SpewSection,
}

#[derive(Debug, Default, Deserialize)]
struct SpewSection {
    report_db: Option<String>,
    identity: Option<String>,
    digest: Option<String>,
    charset: Option<String>,
    threads: Option<usize>,
    queue_capacity: Option<usize>,
    output_dir: Option<String>,
    output_metadata: Option<bool>,
    follow_links: Option<bool>,
    include_hidden: Option<bool>,
    exclude: Option<Vec<String>>,
    max_depth: Option<usize>,
    verbose: Option<bool>,
    await_timeout: Option<u64>,
}

/// Load `.docbatch.toml` from `dir` if present. Returns None if the file is missing or unreadable.
pub fn load_docbatch_toml(dir: &Path) -> Option<DocbatchToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Parse a textual setting; a bad value is logged and ignored so the default stays in effect.
fn parse_setting<T>(source: &str, key: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    raw.parse::<T>()
        .map_err(|e| log::warn!("{source}: ignoring {key}: {e}"))
        .ok()
}

/// Apply file config to opts (only fields present in the file).
pub fn apply_file_to_opts(file: &DocbatchToml, opts: &mut Opts) {
    let sec = &file.settings;
    let source = PackagePaths::get().config_filename();
    if let Some(ref p) = sec.report_db {
        opts.report_db = Some(PathBuf::from(p));
    }
    if let Some(v) = sec.identity.as_deref().and_then(|s| parse_setting(source, "identity", s)) {
        opts.identity = v;
    }
    if let Some(v) = sec.digest.as_deref().and_then(|s| parse_setting(source, "digest", s)) {
        opts.digest_algorithm = v;
    }
    if let Some(v) = sec.charset.as_deref().and_then(|s| parse_setting(source, "charset", s)) {
        opts.charset = v;
    }
    if let Some(n) = sec.threads {
        opts.num_threads = Some(n);
    }
    apply_file_opt!(sec, opts, queue_capacity => queue_capacity);
    if let Some(ref p) = sec.output_dir {
        opts.output_dir = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, opts, output_metadata => output_metadata);
    apply_file_opt!(sec, opts, follow_links => follow_links);
    apply_file_opt!(sec, opts, include_hidden => include_hidden);
    if let Some(ref v) = sec.exclude {
        opts.exclude = v.clone();
    }
    if let Some(d) = sec.max_depth {
        opts.max_depth = Some(d);
    }
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, await_timeout => await_timeout_secs);
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(PackagePaths::get().env_var(key))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Apply `DOCBATCH_REPORT_DB` and `DOCBATCH_THREADS` (after loading `.env` from `dir` or the cwd).
pub fn apply_env_to_opts(dir: &Path, opts: &mut Opts) {
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
    } else {
        let _ = dotenvy::dotenv();
    }
    if let Some(p) = env_value("REPORT_DB") {
        opts.report_db = Some(PathBuf::from(p));
    }
    if let Some(n) = env_value("THREADS") {
        match n.parse::<usize>() {
            Ok(n) => opts.num_threads = Some(n),
            Err(e) => log::warn!("{}: {}", PackagePaths::get().env_var("THREADS"), e),
        }
    }
}
