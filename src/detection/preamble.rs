//! Header location: skip leading metadata lines until the field count stabilizes.

use tracing::debug;

/// Number of consecutive records (header included) that must share a field count.
pub const STABLE_RUN_LEN: usize = 3;

/// Where the header sits in a list of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLocation {
    /// Record `index` is the header; earlier records are preamble.
    Header { index: usize, column_count: usize },
    /// No stable run was found; every record is data.
    Headerless { column_count: usize },
}

impl HeaderLocation {
    pub fn column_count(&self) -> usize {
        match *self {
            HeaderLocation::Header { column_count, .. } => column_count,
            HeaderLocation::Headerless { column_count } => column_count,
        }
    }

    /// Number of records discarded before the header.
    pub fn preamble_len(&self) -> usize {
        match *self {
            HeaderLocation::Header { index, .. } => index,
            HeaderLocation::Headerless { .. } => 0,
        }
    }
}

/// Field counts of one record: `len` as split, `width` without trailing empty fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    pub len: usize,
    pub width: usize,
}

impl RecordShape {
    pub fn of<S: AsRef<str>>(record: &[S]) -> Self {
        Self {
            len: record.len(),
            width: effective_width(record),
        }
    }

    /// A record fits `columns` when only blank cells have to be padded or dropped.
    pub fn fits(&self, columns: usize) -> bool {
        self.width <= columns && columns <= self.len
    }
}

impl From<usize> for RecordShape {
    fn from(n: usize) -> Self {
        Self { len: n, width: n }
    }
}

/// Field count of a record, ignoring trailing empty fields (`a;b;` counts as 2).
pub fn effective_width<S: AsRef<str>>(record: &[S]) -> usize {
    record
        .iter()
        .rposition(|f| !f.as_ref().trim().is_empty())
        .map_or(0, |i| i + 1)
}

/// Column count of a stable run starting at `start`, if one does.
///
/// The run needs `min(run_len, remaining)` records, at least two, that all fit a common
/// column count. The narrowest such count is used, so trailing delimiters on every record
/// do not add a blank column.
fn stable_width(shapes: &[RecordShape], start: usize, run_len: usize) -> Option<usize> {
    let k = run_len.min(shapes.len() - start);
    if k < 2 {
        return None;
    }
    let run = &shapes[start..start + k];
    let width = run.iter().map(|s| s.width).max()?;
    (width > 0 && run.iter().all(|s| s.fits(width))).then_some(width)
}

/// First stable run starting in `from..limit`, as `(start, width)`.
fn next_run(shapes: &[RecordShape], from: usize, limit: usize, run_len: usize) -> Option<(usize, usize)> {
    (from..limit).find_map(|i| stable_width(shapes, i, run_len).map(|w| (i, w)))
}

/// Locate the header from per-record shapes.
///
/// Only runs starting within the first `window` records are considered, and the first one
/// wins. The exception is a metadata block: a run cut short by a stray record (one that
/// does not start a run itself) is skipped when the next run after it is wider. A next run
/// of the same width continues the block and is checked the same way. Anything directly
/// after the table, such as a wider totals block, never displaces it.
pub fn locate_header(shapes: &[RecordShape], window: usize, run_len: usize) -> HeaderLocation {
    match shapes {
        [] => return HeaderLocation::Headerless { column_count: 0 },
        [only] => {
            return HeaderLocation::Header {
                index: 0,
                column_count: only.width,
            };
        }
        _ => {}
    }

    let run_len = run_len.max(2);
    let limit = shapes.len().min(window);
    let mut from = 0;
    let found = 'search: loop {
        let Some((index, width)) = next_run(shapes, from, limit, run_len) else {
            break None;
        };
        let mut cursor = index;
        loop {
            let end = (cursor + 1..shapes.len())
                .find(|&j| !shapes[j].fits(width))
                .unwrap_or(shapes.len());
            if end == shapes.len() || stable_width(shapes, end, run_len).is_some() {
                break 'search Some((index, width));
            }
            match next_run(shapes, end, limit, run_len) {
                Some((next, w)) if w == width => cursor = next,
                Some((next, w)) if w > width => {
                    debug!(start = index, end, width, "skipping metadata block");
                    from = next;
                    continue 'search;
                }
                _ => break 'search Some((index, width)),
            }
        }
    };

    let location = match found {
        Some((index, column_count)) => HeaderLocation::Header { index, column_count },
        None => HeaderLocation::Headerless {
            column_count: shapes[0].width,
        },
    };
    debug!(?location, records = shapes.len(), "header located");
    location
}
