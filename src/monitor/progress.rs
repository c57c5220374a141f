//! Built-in listeners: a kdam progress bar and a debug log sink.

use kdam::{Animation, Bar, BarExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::Notifiable;

/// Terminal progress bar. Starts as a counter; becomes a percentage bar once a total is hinted.
pub struct ProgressBarListener {
    bar: Mutex<Bar>,
}

impl ProgressBarListener {
    pub fn new(desc: &'static str) -> Self {
        let bar = kdam::tqdm!(
            total = 0,
            desc = desc,
            animation = Animation::Classic,
            position = 0,
            unit = " docs"
        );
        Self {
            bar: Mutex::new(bar),
        }
    }

    /// Redraw the bar one last time (call after the run so the final count is shown).
    pub fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            let _ = bar.refresh();
            eprintln!();
        }
    }
}

impl Notifiable for ProgressBarListener {
    fn notify(&self, _detail: Option<&str>) {
        // Blocking lock: a skipped update would be lost for good, the bar counts steps.
        if let Ok(mut bar) = self.bar.lock() {
            let _ = bar.update(1);
        }
    }

    fn hint_remaining(&self, total: usize) {
        if let Ok(mut bar) = self.bar.lock() {
            bar.total = total;
            let _ = bar.refresh();
        }
    }
}

/// Logs every step at debug level with a running count.
#[derive(Default)]
pub struct LogListener {
    steps: AtomicUsize,
    total: AtomicUsize,
}

impl LogListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::Relaxed)
    }
}

impl Notifiable for LogListener {
    fn notify(&self, detail: Option<&str>) {
        let n = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        let detail = detail.unwrap_or("-");
        if total > 0 {
            log::debug!("[{}/{}] {}", n, total, detail);
        } else {
            log::debug!("[{}] {}", n, detail);
        }
    }

    fn hint_remaining(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }
}
