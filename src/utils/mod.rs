pub mod config;
pub mod docbatch_toml;
pub mod fd_limit;
pub mod logger;

pub use config::*;
pub use docbatch_toml::{apply_env_to_opts, apply_file_to_opts, load_docbatch_toml};
pub use fd_limit::{FDS_PER_WORKER, max_open_fds, max_workers_by_fd_limit, resolve_worker_count};
pub use logger::{Colors, setup_logging};
