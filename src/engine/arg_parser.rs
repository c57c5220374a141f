//! Renders the static task tables into a clap command and maps parsed values back into [`Opts`].

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::engine::tasks::{OptionDescriptor, ParameterType, TASKS, Task, TaskDescriptor, opt};
use crate::utils::config::PackagePaths;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
    pub const DIR_ARG: &'static str = "dir";
}

fn option_arg(option: &OptionDescriptor) -> Arg {
    let mut arg = Arg::new(option.name).long(option.name).help(option.description);
    if let Some(code) = option.code {
        arg = arg.short(code);
    }
    match option.parameter {
        ParameterType::Flag => arg.action(ArgAction::SetTrue),
        ParameterType::Path => arg.value_name("PATH").value_parser(value_parser!(PathBuf)),
        ParameterType::Count => arg.value_name("N").value_parser(value_parser!(usize)),
        ParameterType::Seconds => arg.value_name("SECS").value_parser(value_parser!(u64)),
        ParameterType::Choice(values) => arg
            .value_name("NAME")
            .ignore_case(true)
            .value_parser(PossibleValuesParser::new(values.iter().copied())),
        ParameterType::List => arg
            .value_name("PATTERN")
            .num_args(1..)
            .action(ArgAction::Append),
    }
}

fn task_command(task: &TaskDescriptor) -> Command {
    let dir = Arg::new(DefaultArgs::DIR_ARG)
        .value_name("DIR")
        .help("Directory to process (and default report location). Default: current directory.")
        .default_value(DefaultArgs::DIR)
        .value_parser(value_parser!(PathBuf));
    Command::new(task.task.name())
        .about(task.description)
        .arg(dir)
        .args(task.options.iter().map(option_arg))
}

/// The full command line: one subcommand per task table entry.
pub fn build_command() -> Command {
    Command::new(PackagePaths::get().pkg_name())
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resumable batch document extraction.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommands(TASKS.iter().map(task_command))
}

/// A parsed command line: which task, on which directory, with which options.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub task: Task,
    pub dir: PathBuf,
    matches: ArgMatches,
}

impl Invocation {
    /// Parse `std::env::args_os()`; prints help/usage and exits on error like any clap binary.
    pub fn from_env() -> Self {
        let matches = build_command().get_matches();
        Self::from_matches(matches).unwrap_or_else(|e| {
            eprintln!("{e:#}");
            std::process::exit(2)
        })
    }

    /// Parse an explicit argument list (first item is the binary name).
    pub fn try_parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = build_command().try_get_matches_from(args)?;
        Self::from_matches(matches)
    }

    fn from_matches(matches: ArgMatches) -> Result<Self> {
        let (name, sub) = matches
            .subcommand()
            .context("no task given")?;
        let task = Task::from_name(name).with_context(|| format!("unknown task: {name}"))?;
        let dir = sub
            .get_one::<PathBuf>(DefaultArgs::DIR_ARG)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DefaultArgs::DIR));
        Ok(Self {
            task,
            dir,
            matches: sub.clone(),
        })
    }

    /// True if `name` is a flag of this task and was given.
    pub fn flag(&self, name: &str) -> bool {
        self.matches
            .try_get_one::<bool>(name)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }

    pub fn path(&self, name: &str) -> Option<PathBuf> {
        self.matches.try_get_one::<PathBuf>(name).ok().flatten().cloned()
    }

    pub fn count(&self, name: &str) -> Option<usize> {
        self.matches.try_get_one::<usize>(name).ok().flatten().copied()
    }

    pub fn seconds(&self, name: &str) -> Option<u64> {
        self.matches.try_get_one::<u64>(name).ok().flatten().copied()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.matches.try_get_one::<String>(name).ok().flatten().cloned()
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        self.matches
            .try_get_many::<String>(name)
            .ok()
            .flatten()
            .map(|v| v.cloned().collect())
            .unwrap_or_default()
    }

    pub fn verbose(&self) -> bool {
        self.flag(opt::VERBOSE)
    }

    /// Report database for maintenance tasks: `--report`, else `DIR/.docbatch.db`.
    pub fn report_path(&self) -> PathBuf {
        self.path(opt::REPORT)
            .unwrap_or_else(|| default_report_path(&self.dir))
    }

    /// Apply command-line values over `opts` (only options that were given).
    pub fn apply_to_opts(&self, opts: &mut Opts) -> Result<()> {
        if let Some(p) = self.path(opt::REPORT) {
            opts.report_db = Some(p);
        }
        if let Some(v) = self.text(opt::IDENTITY) {
            opts.identity = v.parse()?;
        }
        if let Some(v) = self.text(opt::DIGEST) {
            opts.digest_algorithm = v.parse()?;
        }
        if let Some(v) = self.text(opt::CHARSET) {
            opts.charset = v.parse()?;
        }
        if let Some(n) = self.count(opt::THREADS) {
            opts.num_threads = Some(n);
        }
        if let Some(n) = self.count(opt::QUEUE_CAPACITY) {
            opts.queue_capacity = n;
        }
        if let Some(p) = self.path(opt::OUTPUT) {
            opts.output_dir = Some(p);
        }
        if let Some(d) = self.count(opt::MAX_DEPTH) {
            opts.max_depth = Some(d);
        }
        if let Some(s) = self.seconds(opt::AWAIT_TIMEOUT) {
            opts.await_timeout_secs = s;
        }
        let excludes = self.list(opt::EXCLUDE);
        if !excludes.is_empty() {
            opts.exclude = excludes;
        }
        opts.output_metadata |= self.flag(opt::METADATA);
        opts.follow_links |= self.flag(opt::FOLLOW_LINKS);
        opts.include_hidden |= self.flag(opt::HIDDEN);
        opts.force |= self.flag(opt::FORCE);
        opts.verbose |= self.verbose();
        Ok(())
    }
}

pub fn default_report_path(dir: &Path) -> PathBuf {
    dir.join(PackagePaths::get().report_filename())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityKind;
    use crate::document::DigestAlgorithm;

    #[test]
    fn command_is_well_formed() {
        build_command().debug_assert();
    }

    #[test]
    fn spew_options_map_into_opts() {
        let inv = Invocation::try_parse_from([
            "docbatch", "spew", "/data", "-i", "digest", "-a", "blake3", "-t", "3", "-e", "*.log",
            "*.tmp", "--force",
        ])
        .unwrap();
        assert_eq!(inv.task, Task::Spew);
        assert_eq!(inv.dir, PathBuf::from("/data"));
        let mut opts = Opts::default();
        inv.apply_to_opts(&mut opts).unwrap();
        assert_eq!(opts.identity, IdentityKind::Digest);
        assert_eq!(opts.digest_algorithm, DigestAlgorithm::Blake3);
        assert_eq!(opts.num_threads, Some(3));
        assert_eq!(opts.exclude, vec!["*.log".to_string(), "*.tmp".to_string()]);
        assert!(opts.force);
        assert!(!opts.follow_links);
    }

    #[test]
    fn options_of_other_tasks_are_absent_not_fatal() {
        let inv = Invocation::try_parse_from(["docbatch", "summary"]).unwrap();
        assert_eq!(inv.dir, PathBuf::from("."));
        assert!(!inv.flag(opt::FORCE));
        assert_eq!(inv.count(opt::THREADS), None);
        assert_eq!(inv.report_path(), PathBuf::from(".").join(".docbatch.db"));
    }

    #[test]
    fn unknown_choice_is_rejected() {
        assert!(Invocation::try_parse_from(["docbatch", "spew", "-a", "md5"]).is_err());
    }
}
