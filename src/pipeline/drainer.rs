//! Queue drainer: the loop each consumer worker runs until the queue is sealed and empty.

use std::path::PathBuf;

use super::context::DocumentQueue;
use crate::concurrent::{CancelToken, LatchWait};
use crate::utils::config::CANCEL_POLL_INTERVAL;

/// Pull paths from `queue` and hand each to `handle` until the latch reports sealed with nothing
/// pending, or `cancel` fires. Each path handled consumes exactly one latch signal.
/// Stops at the first error from `handle`. Returns the number of paths handled.
pub fn drain_queue<F, E>(
    queue: &DocumentQueue,
    cancel: &CancelToken,
    mut handle: F,
) -> Result<usize, E>
where
    F: FnMut(PathBuf) -> Result<(), E>,
{
    let mut handled = 0_usize;
    while !cancel.is_cancelled() {
        match queue.latch().wait_timeout(CANCEL_POLL_INTERVAL) {
            LatchWait::Signalled => {
                let Some(path) = queue.take() else { break };
                handle(path)?;
                handled += 1;
            }
            LatchWait::Sealed => break,
            LatchWait::TimedOut => {}
        }
    }
    Ok(handled)
}
