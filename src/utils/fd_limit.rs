//! File descriptor limit detection for capping the extraction worker pool (Unix).

/// Estimated descriptors held per extraction worker (source file, mmap, output text, output metadata).
pub const FDS_PER_WORKER: usize = 4;

/// Descriptors reserved for the report database, its WAL/SHM files, the scanner and stdio.
const RESERVED_FDS: u64 = 32;

/// Fraction of the remaining FD limit the pool may use.
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Returns the soft limit for max open file descriptors, or `None` if unavailable (e.g. Windows).
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Largest worker count that keeps the pool under ~80% of the descriptors left after the reserve.
/// Returns `None` if no limit is available (use caller's default).
pub fn max_workers_by_fd_limit() -> Option<usize> {
    let limit = max_open_fds()?;
    let usable = (limit.saturating_sub(RESERVED_FDS) as f64 * FD_LIMIT_FRACTION) as usize;
    Some((usable / FDS_PER_WORKER).max(1))
}

/// Resolve the consumer pool size: explicit request, else rayon's thread count, capped by the FD limit.
pub fn resolve_worker_count(requested: Option<usize>) -> usize {
    let limits = super::config::WorkerThreadLimits::current();
    let wanted = requested.unwrap_or(limits.all_threads).max(limits.floor);
    match max_workers_by_fd_limit() {
        Some(cap) if cap < wanted => {
            log::debug!("Capping workers {} -> {} (FD limit)", wanted, cap);
            cap
        }
        _ => wanted,
    }
}
