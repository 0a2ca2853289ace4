//! Batch normalization over many files with configurable parallelism.
//!
//! This module sits "above" [`crate::ingestion`] and provides:
//!
//! - Directory scanning for candidate files ([`scan_directory`])
//! - Parallel normalization on a dedicated `rayon` pool, throttled by in-flight file count
//! - Real-time metrics + observer hooks for monitoring
//!
//! Every file gets its own [`FileOutcome`]; a failing file never aborts the batch.

mod observer;
mod semaphore;

use std::borrow::Borrow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{IngestionFailure, NormalizeError};
use crate::ingestion::{normalize_with_options, NormalizeOptions, SourceFormat};
use crate::types::{NormalizedTable, RawFile};

pub use observer::{BatchEvent, BatchMetrics, BatchMetricsSnapshot, BatchObserver, StdErrBatchObserver};

use semaphore::Semaphore;

/// Configuration for the [`BatchEngine`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on files being decoded at the same time.
    ///
    /// Each in-flight file holds its whole byte buffer, so this bounds peak memory.
    pub max_in_flight_files: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        let n = available_threads();
        Self {
            num_threads: Some(n),
            max_in_flight_files: n,
        }
    }
}

/// Result of normalizing one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub result: Result<NormalizedTable, IngestionFailure>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn table(&self) -> Option<&NormalizedTable> {
        self.result.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&IngestionFailure> {
        self.result.as_ref().err()
    }
}

/// Normalizes batches of files on a dedicated thread pool.
pub struct BatchEngine {
    pool: ThreadPool,
    opts: BatchOptions,
    normalize: NormalizeOptions,
    observer: Option<Arc<dyn BatchObserver>>,
    metrics: Arc<BatchMetrics>,
}

impl BatchEngine {
    /// Create a new engine with the given options.
    ///
    /// `num_threads == Some(0)` and `max_in_flight_files == 0` are treated as one.
    pub fn new(opts: BatchOptions) -> Result<Self, ThreadPoolBuildError> {
        let n_threads = opts.num_threads.unwrap_or_else(available_threads).max(1);
        let pool = ThreadPoolBuilder::new().num_threads(n_threads).build()?;

        Ok(Self {
            pool,
            opts,
            normalize: NormalizeOptions::default(),
            observer: None,
            metrics: Arc::new(BatchMetrics::new()),
        })
    }

    /// Options passed to every per-file [`normalize_with_options`] call.
    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// Attach an observer for batch events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time batch metrics.
    pub fn metrics(&self) -> Arc<BatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Normalize files already in memory. Outcomes are returned in input order.
    pub fn normalize_all(&self, files: &[RawFile]) -> Vec<FileOutcome> {
        self.run(files.len(), |sem| {
            files
                .par_iter()
                .map(|raw| self.throttled(sem, raw.path(), || Ok(raw)))
                .collect()
        })
    }

    /// Read and normalize files from disk. Outcomes are returned in input order.
    ///
    /// A file that cannot be read becomes a failure of kind [`crate::error::FailureKind::Io`].
    pub fn normalize_paths(&self, paths: &[PathBuf]) -> Vec<FileOutcome> {
        self.run(paths.len(), |sem| {
            paths
                .par_iter()
                .map(|path| self.throttled(sem, path, || RawFile::from_path(path)))
                .collect()
        })
    }

    /// Scan `dir` for candidate files and normalize them.
    pub fn inspect_directory(&self, dir: impl AsRef<Path>, recursive: bool) -> io::Result<Vec<FileOutcome>> {
        let paths = scan_directory(dir, recursive)?;
        Ok(self.normalize_paths(&paths))
    }

    fn run<F>(&self, files: usize, body: F) -> Vec<FileOutcome>
    where
        F: FnOnce(&Semaphore) -> Vec<FileOutcome> + Send,
    {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(BatchEvent::RunStarted { files });

        let sem = Semaphore::new(self.opts.max_in_flight_files);
        let out = self.pool.install(|| body(&sem));

        self.metrics.end_run(start.elapsed());
        self.emit(BatchEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        debug!(files, elapsed = ?start.elapsed(), "batch finished");
        out
    }

    fn throttled<T, L>(&self, sem: &Semaphore, path: &Path, load: L) -> FileOutcome
    where
        T: Borrow<RawFile>,
        L: FnOnce() -> io::Result<T>,
    {
        let (_permit, waited) = sem.guard();
        if !waited.is_zero() {
            self.metrics.on_throttle_wait(waited);
            self.emit(BatchEvent::ThrottleWaited { duration: waited });
        }
        self.emit(BatchEvent::FileStarted {
            path: path.to_path_buf(),
        });

        let (size_bytes, result) = match load() {
            Ok(raw) => {
                let raw: &RawFile = raw.borrow();
                let size = raw.size_bytes();
                self.metrics.on_file_start(size);
                (size, normalize_with_options(raw, &self.normalize))
            }
            Err(e) => {
                self.metrics.on_file_start(0);
                (0, Err(IngestionFailure::new(path, NormalizeError::Io(e))))
            }
        };

        match &result {
            Ok(table) => {
                let degraded = table.quality().is_degraded();
                self.metrics.on_file_end(true, degraded);
                self.emit(BatchEvent::FileNormalized {
                    path: path.to_path_buf(),
                    rows: table.row_count(),
                    degraded,
                });
            }
            Err(failure) => {
                self.metrics.on_file_end(false, false);
                self.emit(BatchEvent::FileFailed {
                    path: path.to_path_buf(),
                    kind: failure.kind(),
                });
            }
        }

        FileOutcome {
            path: path.to_path_buf(),
            size_bytes,
            result,
        }
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

/// List candidate files (`csv`, `xls`, `xlsx`, any case) under `dir`, sorted by path.
///
/// With `recursive == false` only direct children are listed. A `dir` that is not a
/// directory is an I/O error.
pub fn scan_directory(dir: impl AsRef<Path>, recursive: bool) -> io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("not a directory: {}", dir.display()),
        ));
    }

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 });

    let mut out = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SourceFormat::from_extension)
            .is_some();
        if supported {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

fn available_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
