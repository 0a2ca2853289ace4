use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionFailure;
use crate::types::QualityFlags;

use super::unified::SourceFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NormalizeSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (degraded result, or a file that is simply not a table).
    Warning,
    /// Error-level event (the file could not be normalized).
    Error,
    /// Critical error (I/O or other infrastructure failures).
    Critical,
}

/// Context about a normalization attempt.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    /// Path of the file (diagnostics only).
    pub path: PathBuf,
    /// Format used, if the extension was recognized.
    pub format: Option<SourceFormat>,
    /// Size of the input in bytes.
    pub size_bytes: u64,
}

/// Minimal stats reported on successful normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows: usize,
    pub columns: usize,
}

/// Observer interface for normalization outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait NormalizeObserver: Send + Sync {
    /// Called when normalization succeeds.
    fn on_success(&self, _ctx: &NormalizeContext, _stats: NormalizeStats) {}

    /// Called after `on_success` when the table carries quality flags.
    fn on_degraded(&self, _ctx: &NormalizeContext, _quality: &QualityFlags) {}

    /// Called when normalization fails.
    fn on_failure(&self, _ctx: &NormalizeContext, _severity: NormalizeSeverity, _failure: &IngestionFailure) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        self.on_failure(ctx, severity, failure)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn NormalizeObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn NormalizeObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl NormalizeObserver for CompositeObserver {
    fn on_success(&self, ctx: &NormalizeContext, stats: NormalizeStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_degraded(&self, ctx: &NormalizeContext, quality: &QualityFlags) {
        for o in &self.observers {
            o.on_degraded(ctx, quality);
        }
    }

    fn on_failure(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        for o in &self.observers {
            o.on_failure(ctx, severity, failure);
        }
    }

    fn on_alert(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        for o in &self.observers {
            o.on_alert(ctx, severity, failure);
        }
    }
}

/// Logs normalization events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl NormalizeObserver for StdErrObserver {
    fn on_success(&self, ctx: &NormalizeContext, stats: NormalizeStats) {
        eprintln!(
            "[normalize][ok] format={:?} path={} rows={} columns={}",
            ctx.format,
            ctx.path.display(),
            stats.rows,
            stats.columns
        );
    }

    fn on_degraded(&self, ctx: &NormalizeContext, quality: &QualityFlags) {
        eprintln!(
            "[normalize][degraded] path={} flags={}",
            ctx.path.display(),
            quality.names().join(",")
        );
    }

    fn on_failure(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        eprintln!(
            "[normalize][{:?}] format={:?} path={} kind={} err={}",
            severity,
            ctx.format,
            ctx.path.display(),
            failure.kind(),
            failure.error
        );
    }

    fn on_alert(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        eprintln!(
            "[ALERT][normalize][{:?}] format={:?} path={} kind={} err={}",
            severity,
            ctx.format,
            ctx.path.display(),
            failure.kind(),
            failure.error
        );
    }
}

/// Forwards normalization events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl NormalizeObserver for TracingObserver {
    fn on_success(&self, ctx: &NormalizeContext, stats: NormalizeStats) {
        tracing::info!(
            path = %ctx.path.display(),
            format = ?ctx.format,
            rows = stats.rows,
            columns = stats.columns,
            "normalized"
        );
    }

    fn on_degraded(&self, ctx: &NormalizeContext, quality: &QualityFlags) {
        tracing::warn!(
            path = %ctx.path.display(),
            flags = %quality.names().join(","),
            padded_rows = quality.padded_rows,
            truncated_rows = quality.truncated_rows,
            "normalized with degraded confidence"
        );
    }

    fn on_failure(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        tracing::error!(
            path = %ctx.path.display(),
            ?severity,
            kind = %failure.kind(),
            error = %failure.error,
            "normalization failed"
        );
    }
}

/// Appends normalization events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl NormalizeObserver for FileObserver {
    fn on_success(&self, ctx: &NormalizeContext, stats: NormalizeStats) {
        self.append_line(&format!(
            "{} ok format={:?} path={} rows={} columns={}",
            unix_ts(),
            ctx.format,
            ctx.path.display(),
            stats.rows,
            stats.columns
        ));
    }

    fn on_degraded(&self, ctx: &NormalizeContext, quality: &QualityFlags) {
        self.append_line(&format!(
            "{} degraded path={} flags={}",
            unix_ts(),
            ctx.path.display(),
            quality.names().join(",")
        ));
    }

    fn on_failure(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        self.append_line(&format!(
            "{} fail severity={:?} format={:?} path={} kind={} err={}",
            unix_ts(),
            severity,
            ctx.format,
            ctx.path.display(),
            failure.kind(),
            failure.error
        ));
    }

    fn on_alert(&self, ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        self.append_line(&format!(
            "{} ALERT severity={:?} format={:?} path={} kind={} err={}",
            unix_ts(),
            severity,
            ctx.format,
            ctx.path.display(),
            failure.kind(),
            failure.error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
