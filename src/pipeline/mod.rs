//! Pipeline components: document queue, scanner, consumer pool, batch orchestration.

pub mod consumer;
pub mod context;
pub mod drainer;
pub mod error_handler;
pub mod orchestrator;
pub mod scanner;

pub use consumer::{DocumentConsumer, EMBED_ID_KEY};
pub use context::{DocumentQueue, SealOnDrop};
pub use drainer::drain_queue;
pub use error_handler::check_for_fatal_error_or_skipped_paths;
pub use orchestrator::{Batch, Interrupter};
pub use scanner::{
    ScanOptions, Scanner, SkippedPaths, WalkOutcome, run_walk_loop, to_outcome_walkdir,
};
