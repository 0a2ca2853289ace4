//! Unified normalization entrypoint.
//!
//! Most callers should use [`normalize`], which turns a [`RawFile`] into a
//! [`NormalizedTable`] or a classified [`IngestionFailure`].
//!
//! - If [`NormalizeOptions::format`] is `None`, the format is taken from the file's declared
//!   extension (`csv`, `xls`, `xlsx`).
//! - If a [`super::observability::NormalizeObserver`] is provided, success, degraded
//!   quality, failures and alerts are reported to it.

use std::fmt;
use std::sync::Arc;

use crate::detection::encoding::EncodingPolicy;
use crate::detection::{DEFAULT_SAMPLE_LINES, STABLE_RUN_LEN};
use crate::error::{FailureKind, IngestionFailure, NormalizeError, NormalizeResult};
use crate::types::{NormalizedTable, RawFile};

use super::csv;
use super::observability::{NormalizeContext, NormalizeObserver, NormalizeSeverity, NormalizeStats};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text.
    Csv,
    /// Legacy binary workbook.
    Xls,
    /// XML-in-zip workbook.
    Xlsx,
}

impl SourceFormat {
    /// Parse a source format from a file extension (case-insensitive, leading dot allowed).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xls" => Some(Self::Xls),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xls => "xls",
            SourceFormat::Xlsx => "xlsx",
        }
    }
}

/// Options controlling normalization.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct NormalizeOptions {
    /// If `None`, use the file's declared extension.
    pub format: Option<SourceFormat>,
    /// Non-blank lines examined by the dialect sniffer and header locator.
    pub sample_lines: usize,
    /// Records (header included) that must share a field count to mark a header.
    pub stable_run_len: usize,
    /// Encoding thresholds, tie-break epsilon and fallback.
    pub encoding: EncodingPolicy,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn NormalizeObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: NormalizeSeverity,
}

impl fmt::Debug for NormalizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizeOptions")
            .field("format", &self.format)
            .field("sample_lines", &self.sample_lines)
            .field("stable_run_len", &self.stable_run_len)
            .field("encoding", &self.encoding)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            format: None,
            sample_lines: DEFAULT_SAMPLE_LINES,
            stable_run_len: STABLE_RUN_LEN,
            encoding: EncodingPolicy::default(),
            observer: None,
            alert_at_or_above: NormalizeSeverity::Critical,
        }
    }
}

/// Normalize a file with default options.
///
/// # Examples
///
/// ```rust
/// use tabular_normalizer::ingestion::normalize;
/// use tabular_normalizer::types::RawFile;
///
/// let raw = RawFile::new(
///     "export.csv",
///     b"Export du 12/01/2024\nCompte FR76\nid;name;amount\n1;Ada;10\n2;Grace;20\n".to_vec(),
/// );
/// let table = normalize(&raw).unwrap();
/// assert_eq!(table.header(), ["id", "name", "amount"]);
/// assert_eq!(table.row_count(), 2);
/// ```
pub fn normalize(raw: &RawFile) -> Result<NormalizedTable, IngestionFailure> {
    normalize_with_options(raw, &NormalizeOptions::default())
}

/// Normalize a file.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row/column stats
/// - `on_degraded` on success when any quality flag is raised
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// Normalization is deterministic: a failure is reported once and never retried with other
/// parameters.
pub fn normalize_with_options(
    raw: &RawFile,
    options: &NormalizeOptions,
) -> Result<NormalizedTable, IngestionFailure> {
    let format = options
        .format
        .or_else(|| SourceFormat::from_extension(raw.extension()));

    let ctx = NormalizeContext {
        path: raw.path().to_path_buf(),
        format,
        size_bytes: raw.size_bytes(),
    };

    let result = match format {
        Some(fmt) => normalize_bytes(raw.bytes(), fmt, options),
        None => Err(NormalizeError::UnsupportedFormat {
            extension: raw.extension().to_string(),
        }),
    };
    let result = result.map_err(|e| IngestionFailure::new(raw.path(), e));

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(table) => {
                obs.on_success(
                    &ctx,
                    NormalizeStats {
                        rows: table.row_count(),
                        columns: table.column_count(),
                    },
                );
                if table.quality().is_degraded() {
                    obs.on_degraded(&ctx, table.quality());
                }
            }
            Err(failure) => {
                let sev = severity_for_failure(failure.kind());
                obs.on_failure(&ctx, sev, failure);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, failure);
                }
            }
        }
    }

    result
}

/// Normalize bytes of a known format.
pub fn normalize_bytes(
    bytes: &[u8],
    format: SourceFormat,
    options: &NormalizeOptions,
) -> NormalizeResult<NormalizedTable> {
    match format {
        SourceFormat::Csv => csv::normalize_csv(bytes, options),
        SourceFormat::Xls | SourceFormat::Xlsx => normalize_excel_dispatch(bytes, format),
    }
}

/// Severity used for observer callbacks.
pub fn severity_for_failure(kind: FailureKind) -> NormalizeSeverity {
    match kind {
        FailureKind::Io => NormalizeSeverity::Critical,
        FailureKind::CorruptContainer | FailureKind::UnsniffableDialect => NormalizeSeverity::Error,
        FailureKind::EmptyFile | FailureKind::UnsupportedFormat => NormalizeSeverity::Warning,
    }
}

fn normalize_excel_dispatch(bytes: &[u8], format: SourceFormat) -> NormalizeResult<NormalizedTable> {
    // Avoid unused warnings when the feature is off.
    let _ = bytes;

    #[cfg(feature = "excel")]
    {
        use super::excel::{normalize_excel, SpreadsheetKind};

        let kind = match format {
            SourceFormat::Xls => SpreadsheetKind::Xls,
            _ => SpreadsheetKind::Xlsx,
        };
        normalize_excel(bytes, kind)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(NormalizeError::UnsupportedFormat {
            extension: format!("{} (excel support not enabled)", format.extension()),
        })
    }
}
