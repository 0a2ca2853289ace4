//! Flat, display-oriented summaries of batch outcomes.

use serde::Serialize;

use crate::error::FailureKind;
use crate::execution::FileOutcome;
use crate::types::TableSource;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One line of an inspection report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionRow {
    pub file_name: String,
    /// Lowercased extension with its leading dot (`.csv`), or empty.
    pub extension: String,
    pub size: String,
    /// `"CSV"` for delimited files, the first sheet's name for workbooks.
    pub sheet: Option<String>,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub rows: Option<usize>,
    pub columns: Option<usize>,
    pub flags: Vec<&'static str>,
    pub failure_kind: Option<FailureKind>,
    pub failure_message: Option<String>,
}

impl InspectionRow {
    pub fn from_outcome(outcome: &FileOutcome) -> Self {
        let file_name = outcome
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = outcome
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let mut row = Self {
            file_name,
            extension,
            size: human_size(outcome.size_bytes),
            sheet: None,
            encoding: None,
            delimiter: None,
            rows: None,
            columns: None,
            flags: Vec::new(),
            failure_kind: None,
            failure_message: None,
        };

        match &outcome.result {
            Ok(table) => {
                match table.source() {
                    TableSource::Csv { encoding, dialect, .. } => {
                        row.sheet = Some("CSV".to_string());
                        row.encoding = Some(encoding.name().to_string());
                        row.delimiter = Some(display_delimiter(dialect.delimiter));
                    }
                    TableSource::Excel { sheet_name, .. } => {
                        row.sheet = Some(sheet_name.clone());
                    }
                }
                row.rows = Some(table.row_count());
                row.columns = Some(table.column_count());
                row.flags = table.quality().names();
            }
            Err(failure) => {
                row.failure_kind = Some(failure.kind());
                row.failure_message = Some(failure.error.to_string());
            }
        }
        row
    }

    pub fn is_failure(&self) -> bool {
        self.failure_kind.is_some()
    }
}

/// `"{:.2} MB"` from 0.01 MB upwards, plain bytes below.
pub fn human_size(bytes: u64) -> String {
    let mb = bytes as f64 / BYTES_PER_MB;
    if mb >= 0.01 {
        format!("{mb:.2} MB")
    } else {
        format!("{bytes} bytes")
    }
}

fn display_delimiter(d: u8) -> String {
    match d {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

/// Build one row per outcome, in order.
pub fn inspection_rows(outcomes: &[FileOutcome]) -> Vec<InspectionRow> {
    outcomes.iter().map(InspectionRow::from_outcome).collect()
}

/// Render rows as pretty-printed JSON.
pub fn to_json(rows: &[InspectionRow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}
