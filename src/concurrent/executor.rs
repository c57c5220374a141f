//! Executor proxy: uniform shutdown / await-termination over whatever runs a component's threads.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Lifecycle façade over a worker pool. Both shutdowns are idempotent and never block.
pub trait ExecutorProxy {
    /// Stop accepting new tasks; running and queued tasks finish.
    fn shutdown(&self);

    /// Cancel running tasks and discard queued ones.
    fn shutdown_now(&self);

    /// Block until every task has finished or `timeout` elapses. True if terminated in time.
    fn await_termination(&self, timeout: Duration) -> bool;
}

/// Cooperative cancellation flag handed to every task.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool {0} is shut down; task rejected")]
    Rejected(String),
    #[error("failed to spawn worker thread for pool {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

type Job = Box<dyn FnOnce(&CancelToken) + Send + 'static>;

/// Live worker count, with a condvar signalled as workers exit.
#[derive(Default)]
struct Liveness {
    live: Mutex<usize>,
    exited: Condvar,
}

impl Liveness {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn worker_exited(&self) {
        let mut live = self.lock();
        *live = live.saturating_sub(1);
        drop(live);
        self.exited.notify_all();
    }
}

/// Fixed-size pool of named threads pulling jobs off a channel.
pub struct ThreadPool {
    name: String,
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    cancel: CancelToken,
    liveness: Arc<Liveness>,
    discarded: Arc<AtomicUsize>,
}

fn worker_loop(
    name: String,
    rx: Receiver<Job>,
    cancel: CancelToken,
    liveness: Arc<Liveness>,
    discarded: Arc<AtomicUsize>,
) {
    while let Ok(job) = rx.recv() {
        if cancel.is_cancelled() {
            discarded.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        if catch_unwind(AssertUnwindSafe(|| job(&cancel))).is_err() {
            log::error!("{}: task panicked", name);
        }
    }
    liveness.worker_exited();
}

impl ThreadPool {
    /// Spawn `size` workers (at least one) named `<name>-<i>`.
    pub fn new(name: &str, size: usize) -> Result<Self, PoolError> {
        let size = size.max(1);
        let (tx, rx) = unbounded::<Job>();
        let cancel = CancelToken::new();
        let liveness = Arc::new(Liveness::default());
        let discarded = Arc::new(AtomicUsize::new(0));
        let pool = Self {
            name: name.to_string(),
            size,
            sender: Mutex::new(Some(tx)),
            cancel: cancel.clone(),
            liveness: Arc::clone(&liveness),
            discarded: Arc::clone(&discarded),
        };
        for i in 0..size {
            let thread_name = format!("{name}-{i}");
            let (rx, cancel, liveness, discarded) = (
                rx.clone(),
                cancel.clone(),
                Arc::clone(&liveness),
                Arc::clone(&discarded),
            );
            *liveness.lock() += 1;
            let spawned = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(thread_name, rx, cancel, liveness, discarded));
            if let Err(source) = spawned {
                *pool.liveness.lock() -= 1;
                pool.shutdown_now();
                return Err(PoolError::Spawn {
                    name: name.to_string(),
                    source,
                });
            }
        }
        log::debug!("Started pool {} with {} worker(s)", name, size);
        Ok(pool)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Token tripped by [`ExecutorProxy::shutdown_now`].
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Queue a task. Rejected once the pool is shut down.
    pub fn execute<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce(&CancelToken) + Send + 'static,
    {
        // Clone out of the lock so a shutdown racing this call never waits on it.
        let tx = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match tx {
            Some(tx) => tx
                .send(Box::new(job))
                .map_err(|_| PoolError::Rejected(self.name.clone())),
            None => Err(PoolError::Rejected(self.name.clone())),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn is_terminated(&self) -> bool {
        self.is_shutdown() && *self.liveness.lock() == 0
    }

    /// Tasks dropped without running because the pool was cancelled.
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::Relaxed)
    }
}

impl ExecutorProxy for ThreadPool {
    fn shutdown(&self) {
        // Dropping the last sender lets workers drain the queue and exit.
        if self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            log::debug!("Pool {} shutting down", self.name);
        }
    }

    fn shutdown_now(&self) {
        if !self.cancel.is_cancelled() {
            log::debug!("Pool {} cancelling", self.name);
        }
        self.cancel.cancel();
        self.shutdown();
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let mut live = self.liveness.lock();
        // Past the clock's range: wait without a deadline.
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            let _live = self
                .liveness
                .exited
                .wait_while(live, |n| *n > 0)
                .unwrap_or_else(PoisonError::into_inner);
            return true;
        };
        while *live > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .liveness
                .exited
                .wait_timeout(live, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            live = guard;
        }
        true
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
