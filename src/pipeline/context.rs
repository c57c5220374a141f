//! Document queue: bounded path channel plus the sealable latch that tells consumers whether more is coming.

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use std::path::PathBuf;
use std::sync::Arc;

use crate::concurrent::{CancelToken, SealableLatch};
use crate::utils::config::CANCEL_POLL_INTERVAL;

/// Scanner → worker handoff. Every successful [`put`](Self::put) signals the latch once; the
/// producer seals it when enumeration ends.
#[derive(Clone)]
pub struct DocumentQueue {
    tx: Sender<PathBuf>,
    rx: Receiver<PathBuf>,
    latch: Arc<SealableLatch>,
}

impl DocumentQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded::<PathBuf>(capacity.max(1));
        Self {
            tx,
            rx,
            latch: Arc::new(SealableLatch::new()),
        }
    }

    /// Enqueue `path`, blocking while the queue is full. Returns false if `cancel` fired first.
    pub fn put(&self, path: PathBuf, cancel: &CancelToken) -> bool {
        let mut item = path;
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            match self.tx.send_timeout(item, CANCEL_POLL_INTERVAL) {
                Ok(()) => {
                    self.latch.signal();
                    return true;
                }
                Err(SendTimeoutError::Timeout(back)) => item = back,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    /// Take the path matching a latch signal the caller has just consumed. Every signal follows
    /// its send, so a consumed signal always has a path waiting.
    pub fn take(&self) -> Option<PathBuf> {
        self.rx.recv().ok()
    }

    pub fn seal(&self) {
        self.latch.seal();
    }

    pub fn is_sealed(&self) -> bool {
        self.latch.is_sealed()
    }

    pub fn latch(&self) -> &SealableLatch {
        &self.latch
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Seals the queue when dropped, so consumers are released even if the producer task never runs.
pub struct SealOnDrop(pub DocumentQueue);

impl Drop for SealOnDrop {
    fn drop(&mut self) {
        self.0.seal();
    }
}
