use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Convenience result type for detection and normalization steps.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Error type returned by the detection and normalization steps.
///
/// These errors carry no file path; [`crate::ingestion::normalize`] wraps them in an
/// [`IngestionFailure`] together with the offending path.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The byte buffer is empty.
    #[error("file is empty")]
    EmptyFile,

    /// No delimiter candidate reached the minimum consistency across the sample window.
    #[error("cannot sniff dialect: {message}")]
    UnsniffableDialect { message: String },

    /// The spreadsheet container could not be opened or read.
    #[error("corrupt {format} container: {message}")]
    CorruptContainer { format: String, message: String },

    /// The declared extension is not one of `csv`, `xls`, `xlsx`.
    #[error("unsupported format '{extension}'")]
    UnsupportedFormat { extension: String },

    /// The sniffed dialect could not split the decoded text into records.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying I/O error while loading a file from disk (batch layer only).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NormalizeError {
    /// Classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            NormalizeError::EmptyFile => FailureKind::EmptyFile,
            NormalizeError::UnsniffableDialect { .. } | NormalizeError::Csv(_) => {
                FailureKind::UnsniffableDialect
            }
            NormalizeError::CorruptContainer { .. } => FailureKind::CorruptContainer,
            NormalizeError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            NormalizeError::Io(_) => FailureKind::Io,
        }
    }
}

/// Failure taxonomy. Every kind is per-file and non-fatal to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EmptyFile,
    UnsniffableDialect,
    CorruptContainer,
    UnsupportedFormat,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::EmptyFile => "empty_file",
            FailureKind::UnsniffableDialect => "unsniffable_dialect",
            FailureKind::CorruptContainer => "corrupt_container",
            FailureKind::UnsupportedFormat => "unsupported_format",
            FailureKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// A classified, terminal failure for one file.
#[derive(Debug, Error)]
#[error("{path}: {error}", path = .path.display())]
pub struct IngestionFailure {
    /// Path of the file that failed (diagnostics only).
    pub path: PathBuf,
    /// Underlying classified error.
    #[source]
    pub error: NormalizeError,
}

impl IngestionFailure {
    pub fn new(path: impl Into<PathBuf>, error: NormalizeError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }

    /// Classification of the failure.
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }

    /// Optional diagnostic message (the variant's message, when it has one).
    pub fn message(&self) -> Option<String> {
        match &self.error {
            NormalizeError::EmptyFile => None,
            NormalizeError::UnsniffableDialect { message } => Some(message.clone()),
            NormalizeError::CorruptContainer { message, .. } => Some(message.clone()),
            NormalizeError::UnsupportedFormat { extension } => {
                Some(format!("extension '{extension}'"))
            }
            NormalizeError::Csv(e) => Some(e.to_string()),
            NormalizeError::Io(e) => Some(e.to_string()),
        }
    }
}
