use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::FailureKind;

/// Events emitted by the [`super::BatchEngine`].
#[derive(Debug, Clone)]
pub enum BatchEvent {
    RunStarted { files: usize },
    ThrottleWaited { duration: Duration },
    FileStarted { path: PathBuf },
    FileNormalized { path: PathBuf, rows: usize, degraded: bool },
    FileFailed { path: PathBuf, kind: FailureKind },
    RunFinished {
        elapsed: Duration,
        metrics: BatchMetricsSnapshot,
    },
}

/// Observer hook for batch events.
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent);
}

/// A simple stderr logger for batch events.
#[derive(Debug, Default)]
pub struct StdErrBatchObserver;

impl BatchObserver for StdErrBatchObserver {
    fn on_event(&self, event: &BatchEvent) {
        eprintln!("{event:?}");
    }
}

/// Real-time counters for a batch run.
///
/// The engine updates these while files are processed; callers can snapshot them at any time.
#[derive(Debug, Default)]
pub struct BatchMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    files_started: AtomicU64,
    files_normalized: AtomicU64,
    files_degraded: AtomicU64,
    files_failed: AtomicU64,
    bytes_read: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_files: AtomicUsize,
    max_active_files: AtomicUsize,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.files_started.store(0, Ordering::SeqCst);
        self.files_normalized.store(0, Ordering::SeqCst);
        self.files_degraded.store(0, Ordering::SeqCst);
        self.files_failed.store(0, Ordering::SeqCst);
        self.bytes_read.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.active_files.store(0, Ordering::SeqCst);
        self.max_active_files.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(saturating_nanos(elapsed), Ordering::SeqCst);
    }

    pub fn on_file_start(&self, size_bytes: u64) {
        let _ = self.files_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.bytes_read.fetch_add(size_bytes, Ordering::SeqCst);
        let now = self.active_files.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_active_files.fetch_max(now, Ordering::SeqCst);
    }

    pub fn on_file_end(&self, ok: bool, degraded: bool) {
        if ok {
            let _ = self.files_normalized.fetch_add(1, Ordering::SeqCst);
            if degraded {
                let _ = self.files_degraded.fetch_add(1, Ordering::SeqCst);
            }
        } else {
            let _ = self.files_failed.fetch_add(1, Ordering::SeqCst);
        }
        let _ = self.active_files.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        let _ = self.throttle_wait_ns.fetch_add(saturating_nanos(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BatchMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        BatchMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            files_started: self.files_started.load(Ordering::SeqCst),
            files_normalized: self.files_normalized.load(Ordering::SeqCst),
            files_degraded: self.files_degraded.load(Ordering::SeqCst),
            files_failed: self.files_failed.load(Ordering::SeqCst),
            bytes_read: self.bytes_read.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_files: self.max_active_files.load(Ordering::SeqCst),
        }
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// Immutable snapshot of [`BatchMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub files_started: u64,
    pub files_normalized: u64,
    pub files_degraded: u64,
    pub files_failed: u64,
    pub bytes_read: u64,
    pub throttle_wait: Duration,
    pub max_active_files: usize,
}

impl fmt::Display for BatchMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, files={}/{} (degraded={}, failed={}), bytes={}, max_active_files={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.files_normalized,
            self.files_started,
            self.files_degraded,
            self.files_failed,
            self.bytes_read,
            self.max_active_files,
            self.throttle_wait,
            self.elapsed
        )
    }
}
