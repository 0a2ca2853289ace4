#![cfg(feature = "excel")]

//! Excel normalization over `calamine`.
//!
//! Only the first worksheet is read. Other sheets are ignored; their count is reported in
//! [`TableSource::Excel`] so callers can tell the user.

use std::fmt::Display;
use std::io::{Cursor, Read, Seek};

use calamine::{Data, Range, Reader, Xls, Xlsx};
use tracing::debug;

use crate::error::{NormalizeError, NormalizeResult};
use crate::types::{NormalizedTable, QualityFlags, TableSource};

/// Spreadsheet container flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    /// Legacy binary workbook (`.xls`).
    Xls,
    /// XML-in-zip workbook (`.xlsx`).
    Xlsx,
}

impl SpreadsheetKind {
    pub fn label(&self) -> &'static str {
        match self {
            SpreadsheetKind::Xls => "xls",
            SpreadsheetKind::Xlsx => "xlsx",
        }
    }
}

/// Cells of the first worksheet, coerced to strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSheet {
    pub name: String,
    pub sheet_count: usize,
    pub rows: Vec<Vec<String>>,
}

/// Read the first worksheet of an in-memory workbook as rows of strings.
///
/// Any container-level failure (not a workbook, truncated archive, no sheets) is reported as
/// [`NormalizeError::CorruptContainer`].
pub fn read_first_sheet(bytes: &[u8], kind: SpreadsheetKind) -> NormalizeResult<FirstSheet> {
    let cursor = Cursor::new(bytes);
    match kind {
        SpreadsheetKind::Xls => {
            let workbook: Xls<_> = Reader::new(cursor).map_err(|e| corrupt(kind, e))?;
            first_sheet_of(workbook, kind)
        }
        SpreadsheetKind::Xlsx => {
            let workbook: Xlsx<_> = Reader::new(cursor).map_err(|e| corrupt(kind, e))?;
            first_sheet_of(workbook, kind)
        }
    }
}

fn first_sheet_of<RS, R>(mut workbook: R, kind: SpreadsheetKind) -> NormalizeResult<FirstSheet>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Display,
{
    let names = workbook.sheet_names();
    let name = names
        .first()
        .cloned()
        .ok_or_else(|| corrupt(kind, "workbook has no sheets"))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| corrupt(kind, "first sheet is missing"))?
        .map_err(|e| corrupt(kind, e))?;

    Ok(FirstSheet {
        name,
        sheet_count: names.len(),
        rows: range_to_strings(&range),
    })
}

fn corrupt(kind: SpreadsheetKind, err: impl Display) -> NormalizeError {
    NormalizeError::CorruptContainer {
        format: kind.label().to_string(),
        message: err.to_string(),
    }
}

fn range_to_strings(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect()
}

/// String form of a cell; integral floats print without a fractional part.
pub fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

/// Normalize an in-memory workbook into a [`NormalizedTable`].
///
/// Leading fully-empty rows are skipped; the first remaining row is the header.
pub fn normalize_excel(bytes: &[u8], kind: SpreadsheetKind) -> NormalizeResult<NormalizedTable> {
    if bytes.is_empty() {
        return Err(NormalizeError::EmptyFile);
    }

    let sheet = read_first_sheet(bytes, kind)?;
    if sheet.sheet_count > 1 {
        debug!(
            sheet = %sheet.name,
            ignored = sheet.sheet_count - 1,
            "reading first sheet only"
        );
    }

    let mut rows = sheet
        .rows
        .into_iter()
        .skip_while(|r| r.iter().all(|c| c.is_empty()));
    let header = rows.next().unwrap_or_default();

    Ok(NormalizedTable::assemble(
        header,
        rows,
        QualityFlags::default(),
        TableSource::Excel {
            sheet_name: sheet.name,
            sheet_count: sheet.sheet_count,
        },
    ))
}
