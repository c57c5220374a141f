//! Static task and option tables. The command line is rendered from these; nothing is derived
//! by reflection.

/// Option names, shared by the tables and the code reading parsed values.
pub mod opt {
    pub const REPORT: &str = "report";
    pub const MEMORY_REPORT: &str = "memory-report";
    pub const VERBOSE: &str = "verbose";
    pub const IDENTITY: &str = "identity";
    pub const DIGEST: &str = "digest";
    pub const CHARSET: &str = "charset";
    pub const THREADS: &str = "threads";
    pub const QUEUE_CAPACITY: &str = "queue-capacity";
    pub const OUTPUT: &str = "output";
    pub const METADATA: &str = "metadata";
    pub const FOLLOW_LINKS: &str = "follow-links";
    pub const HIDDEN: &str = "hidden";
    pub const EXCLUDE: &str = "exclude";
    pub const MAX_DEPTH: &str = "max-depth";
    pub const FORCE: &str = "force";
    pub const AWAIT_TIMEOUT: &str = "await-timeout";
    pub const INPUT: &str = "input";
}

/// Value an option takes on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterType {
    /// Present or absent.
    Flag,
    Path,
    /// Non-negative integer.
    Count,
    Seconds,
    /// One of a fixed set of names.
    Choice(&'static [&'static str]),
    /// One or more free-form values; may repeat.
    List,
}

#[derive(Clone, Copy, Debug)]
pub struct OptionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Short form, e.g. `-v`.
    pub code: Option<char>,
    pub parameter: ParameterType,
}

#[derive(Clone, Copy, Debug)]
pub struct TaskDescriptor {
    pub task: Task,
    pub description: &'static str,
    pub options: &'static [OptionDescriptor],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    Spew,
    DumpReport,
    LoadReport,
    WipeReport,
    Summary,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Spew => "spew",
            Task::DumpReport => "dump-report",
            Task::LoadReport => "load-report",
            Task::WipeReport => "wipe-report",
            Task::Summary => "summary",
        }
    }

    pub fn from_name(name: &str) -> Option<Task> {
        TASKS.iter().map(|t| t.task).find(|t| t.name() == name)
    }
}

pub const IDENTITY_CHOICES: &[&str] = &["path", "digest"];
pub const DIGEST_CHOICES: &[&str] = &["SHA-256", "SHA-384", "SHA-512", "BLAKE3"];
pub const CHARSET_CHOICES: &[&str] = &["ASCII", "ISO-8859-1", "UTF-8"];

const REPORT_OPTION: OptionDescriptor = OptionDescriptor {
    name: opt::REPORT,
    description: "Report database. Default: .docbatch.db in DIR.",
    code: Some('r'),
    parameter: ParameterType::Path,
};

const VERBOSE_OPTION: OptionDescriptor = OptionDescriptor {
    name: opt::VERBOSE,
    description: "Verbose output (debug logs, progress bar).",
    code: Some('v'),
    parameter: ParameterType::Flag,
};

const SPEW_OPTIONS: &[OptionDescriptor] = &[
    REPORT_OPTION,
    OptionDescriptor {
        name: opt::MEMORY_REPORT,
        description: "Keep the report in memory only. The run cannot be resumed.",
        code: None,
        parameter: ParameterType::Flag,
    },
    OptionDescriptor {
        name: opt::IDENTITY,
        description: "Identify documents by normalized path or by content digest.",
        code: Some('i'),
        parameter: ParameterType::Choice(IDENTITY_CHOICES),
    },
    OptionDescriptor {
        name: opt::DIGEST,
        description: "Digest algorithm for content identity.",
        code: Some('a'),
        parameter: ParameterType::Choice(DIGEST_CHOICES),
    },
    OptionDescriptor {
        name: opt::CHARSET,
        description: "Charset used to encode embedded-document paths into digests.",
        code: None,
        parameter: ParameterType::Choice(CHARSET_CHOICES),
    },
    OptionDescriptor {
        name: opt::THREADS,
        description: "Number of extraction workers. Default: cores, capped by the open-file limit.",
        code: Some('t'),
        parameter: ParameterType::Count,
    },
    OptionDescriptor {
        name: opt::QUEUE_CAPACITY,
        description: "Bound of the queue between the scanner and the workers.",
        code: None,
        parameter: ParameterType::Count,
    },
    OptionDescriptor {
        name: opt::OUTPUT,
        description: "Write extracted text under this directory instead of stdout.",
        code: Some('o'),
        parameter: ParameterType::Path,
    },
    OptionDescriptor {
        name: opt::METADATA,
        description: "Also write each document's metadata as JSON (with --output).",
        code: Some('m'),
        parameter: ParameterType::Flag,
    },
    OptionDescriptor {
        name: opt::FOLLOW_LINKS,
        description: "Follow symbolic links.",
        code: Some('f'),
        parameter: ParameterType::Flag,
    },
    OptionDescriptor {
        name: opt::HIDDEN,
        description: "Include dot-files.",
        code: Some('H'),
        parameter: ParameterType::Flag,
    },
    OptionDescriptor {
        name: opt::EXCLUDE,
        description: "Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2",
        code: Some('e'),
        parameter: ParameterType::List,
    },
    OptionDescriptor {
        name: opt::MAX_DEPTH,
        description: "Do not descend more than this many levels below DIR.",
        code: Some('d'),
        parameter: ParameterType::Count,
    },
    OptionDescriptor {
        name: opt::FORCE,
        description: "Re-extract documents the report already marks SUCCESS.",
        code: None,
        parameter: ParameterType::Flag,
    },
    OptionDescriptor {
        name: opt::AWAIT_TIMEOUT,
        description: "Seconds to wait for workers to finish once scanning is done.",
        code: None,
        parameter: ParameterType::Seconds,
    },
    VERBOSE_OPTION,
];

const DUMP_OPTIONS: &[OptionDescriptor] = &[
    REPORT_OPTION,
    OptionDescriptor {
        name: opt::OUTPUT,
        description: "Write the JSON dump to this file instead of stdout.",
        code: Some('o'),
        parameter: ParameterType::Path,
    },
    VERBOSE_OPTION,
];

const LOAD_OPTIONS: &[OptionDescriptor] = &[
    REPORT_OPTION,
    OptionDescriptor {
        name: opt::INPUT,
        description: "JSON dump to load (an object of id → status).",
        code: Some('i'),
        parameter: ParameterType::Path,
    },
    VERBOSE_OPTION,
];

const REPORT_ONLY_OPTIONS: &[OptionDescriptor] = &[REPORT_OPTION, VERBOSE_OPTION];

pub static TASKS: &[TaskDescriptor] = &[
    TaskDescriptor {
        task: Task::Spew,
        description: "Extract text from every document under DIR, skipping extracted ones.",
        options: SPEW_OPTIONS,
    },
    TaskDescriptor {
        task: Task::DumpReport,
        description: "Print the report as JSON.",
        options: DUMP_OPTIONS,
    },
    TaskDescriptor {
        task: Task::LoadReport,
        description: "Load report entries from JSON.",
        options: LOAD_OPTIONS,
    },
    TaskDescriptor {
        task: Task::WipeReport,
        description: "Remove every report entry.",
        options: REPORT_ONLY_OPTIONS,
    },
    TaskDescriptor {
        task: Task::Summary,
        description: "Count report entries per status.",
        options: REPORT_ONLY_OPTIONS,
    },
];
