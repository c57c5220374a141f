//! Concurrency primitives: the sealable latch that hands work from producer to consumers, and the
//! executor proxy every threaded component is shut down through.

pub mod executor;
pub mod latch;

pub use executor::{CancelToken, ExecutorProxy, PoolError, ThreadPool};
pub use latch::{LatchWait, SealableLatch};
