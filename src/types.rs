//! Core data model types for normalization.
//!
//! A [`RawFile`] goes in, a [`NormalizedTable`] comes out. Intermediate detection results
//! ([`EncodingGuess`], [`DialectGuess`]) are plain immutable values built fresh per call.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::{Serialize, Serializer};

/// Immutable bytes of one discovered file plus what the caller declared about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    path: PathBuf,
    extension: String,
    bytes: Vec<u8>,
    size_bytes: u64,
}

impl RawFile {
    /// Create a raw file, taking the declared extension from `path`.
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::with_extension(path, extension, bytes)
    }

    /// Create a raw file with an explicit extension tag (overrides the path's extension).
    pub fn with_extension(path: impl Into<PathBuf>, extension: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            path: path.into(),
            extension: extension.into().trim_start_matches('.').to_ascii_lowercase(),
            bytes,
            size_bytes,
        }
    }

    /// Read a file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Ok(Self::new(path, bytes))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared extension, lowercase and without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Chosen text encoding with an explicit confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EncodingGuess {
    #[serde(serialize_with = "serialize_encoding")]
    pub encoding: &'static Encoding,
    pub confidence: f32,
    /// Set when the detector fell back to the default encoding.
    pub low_confidence: bool,
}

impl EncodingGuess {
    /// WHATWG name of the encoding (e.g. `windows-1252`, `UTF-8`).
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

fn serialize_encoding<S: Serializer>(enc: &&'static Encoding, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(enc.name())
}

/// Line terminator convention observed in the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineTerminator {
    #[default]
    Lf,
    CrLf,
    Cr,
}

/// Delimiter, quote character and line terminator of a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DialectGuess {
    pub delimiter: u8,
    pub quote: u8,
    pub terminator: LineTerminator,
}

impl Default for DialectGuess {
    fn default() -> Self {
        Self {
            delimiter: b';',
            quote: b'"',
            terminator: LineTerminator::Lf,
        }
    }
}

/// Non-fatal annotations on a successfully normalized table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityFlags {
    pub low_confidence_encoding: bool,
    pub no_header_detected: bool,
    pub row_length_mismatch: bool,
    /// Rows shorter than the header, padded with empty cells.
    pub padded_rows: usize,
    /// Rows longer than the header, truncated.
    pub truncated_rows: usize,
    /// Rows whose every cell was blank.
    pub blank_rows_skipped: usize,
    /// First decode error, when the chosen encoding had to be replaced by the fallback.
    pub decode_error: Option<String>,
}

impl QualityFlags {
    /// `true` when any flag indicates degraded confidence.
    pub fn is_degraded(&self) -> bool {
        self.low_confidence_encoding || self.no_header_detected || self.row_length_mismatch
    }

    /// Names of the raised flags, in a stable order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.low_confidence_encoding {
            out.push("low_confidence_encoding");
        }
        if self.no_header_detected {
            out.push("no_header_detected");
        }
        if self.row_length_mismatch {
            out.push("row_length_mismatch");
        }
        out
    }
}

/// Where a table came from and what was detected along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableSource {
    Csv {
        encoding: EncodingGuess,
        dialect: DialectGuess,
        /// Number of records discarded before the header.
        preamble_lines: usize,
    },
    Excel {
        /// Name of the sheet that was read (always the first one).
        sheet_name: String,
        /// Number of sheets in the workbook; only the first is read.
        sheet_count: usize,
    },
}

/// Uniform in-memory table produced by normalization.
///
/// `row_count() == rows().len()` and `column_count() == header().len()` always hold, and
/// every row has exactly `column_count()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row_count: usize,
    column_count: usize,
    quality: QualityFlags,
    source: TableSource,
}

impl NormalizedTable {
    /// Build a table from a raw header and raw records.
    ///
    /// The header is trimmed and deduplicated; records are padded/truncated to the header
    /// width (recorded in `quality`) and fully blank records are skipped. Overflow made only
    /// of blank cells is dropped without being counted.
    ///
    /// The result is re-checked with [`Self::is_consistent`] in every build profile.
    pub fn assemble(
        raw_header: Vec<String>,
        records: impl IntoIterator<Item = Vec<String>>,
        mut quality: QualityFlags,
        source: TableSource,
    ) -> Self {
        let header = dedupe_header(raw_header);
        let width = header.len();

        let mut rows = Vec::new();
        for mut record in records {
            if record.iter().all(|c| c.trim().is_empty()) {
                quality.blank_rows_skipped += 1;
                continue;
            }
            if record.len() < width {
                quality.padded_rows += 1;
                record.resize(width, String::new());
            } else if record.len() > width {
                // Trailing delimiters only produce blank overflow; that is not a mismatch.
                if record[width..].iter().any(|c| !c.trim().is_empty()) {
                    quality.truncated_rows += 1;
                }
                record.truncate(width);
            }
            rows.push(record);
        }
        quality.row_length_mismatch = quality.padded_rows > 0 || quality.truncated_rows > 0;

        let table = Self {
            row_count: rows.len(),
            column_count: width,
            header,
            rows,
            quality,
            source,
        };
        assert!(table.is_consistent(), "normalized table invariants violated");
        table
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn quality(&self) -> &QualityFlags {
        &self.quality
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    /// Detected encoding, for CSV sources.
    pub fn encoding(&self) -> Option<&EncodingGuess> {
        match &self.source {
            TableSource::Csv { encoding, .. } => Some(encoding),
            TableSource::Excel { .. } => None,
        }
    }

    /// Sniffed dialect, for CSV sources.
    pub fn dialect(&self) -> Option<&DialectGuess> {
        match &self.source {
            TableSource::Csv { dialect, .. } => Some(dialect),
            TableSource::Excel { .. } => None,
        }
    }

    /// Index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Re-check the structural invariants.
    pub fn is_consistent(&self) -> bool {
        self.row_count == self.rows.len()
            && self.column_count == self.header.len()
            && self.rows.iter().all(|r| r.len() == self.column_count)
            && self.header.iter().collect::<HashSet<_>>().len() == self.header.len()
    }
}

/// Positional name used for blank or synthetic header cells (1-based).
pub fn positional_name(idx0: usize) -> String {
    format!("column_{}", idx0 + 1)
}

fn dedupe_header(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());
    for (idx, name) in raw.into_iter().enumerate() {
        let trimmed = name.trim();
        let base = if trimmed.is_empty() {
            positional_name(idx)
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}
