//! Delimiter, quote and line-terminator sniffing.
//!
//! The delimiter is the candidate whose per-line count is the most *consistent* across the
//! sample window, not the most frequent one: a comma that shows up in a few free-text
//! fields has an irregular per-line count and loses to a semicolon that appears the same
//! number of times on every line.

use tracing::debug;

use crate::error::{NormalizeError, NormalizeResult};
use crate::types::{DialectGuess, LineTerminator};

/// Number of non-blank lines examined by default.
pub const DEFAULT_SAMPLE_LINES: usize = 50;

/// Minimum share of sampled lines that must agree on the modal delimiter count.
pub const MIN_DIALECT_CONSISTENCY: f64 = 0.5;

/// Scores closer than this are tied.
pub const DIALECT_TIE_EPSILON: f64 = 1e-6;

/// Delimiter candidates in tie-break priority order (semicolon before comma).
pub const DELIMITER_CANDIDATES: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Quote candidates; the first one is the default.
pub const QUOTE_CANDIDATES: [u8; 2] = [b'"', b'\''];

/// Consistency measurements for one delimiter candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct DelimiterScore {
    pub delimiter: u8,
    /// Most common non-zero per-line count (0 when the candidate never appears).
    pub modal_count: usize,
    /// Share of sampled lines whose count equals `modal_count`.
    pub consistency: f64,
    /// Population variance of the per-line counts.
    pub variance: f64,
    /// Number of sampled lines containing the candidate at least once.
    pub lines_present: usize,
}

/// First `limit` non-blank physical lines of `text`.
pub fn sample_lines(text: &str, limit: usize) -> Vec<&str> {
    text.split(|c| c == '\n' || c == '\r')
        .filter(|l| !l.trim().is_empty())
        .take(limit)
        .collect()
}

/// Count `delimiter` occurrences in `line` that are outside `quote`-delimited regions.
pub fn count_outside_quotes(line: &str, delimiter: u8, quote: u8) -> usize {
    let mut in_quotes = false;
    let mut n = 0;
    for &b in line.as_bytes() {
        if b == quote {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            n += 1;
        }
    }
    n
}

/// Score every delimiter candidate over the sampled lines, ignoring occurrences inside
/// `quote`-delimited regions.
pub fn score_delimiters(lines: &[&str], quote: u8) -> Vec<DelimiterScore> {
    DELIMITER_CANDIDATES
        .iter()
        .map(|&delimiter| {
            let counts: Vec<usize> = lines
                .iter()
                .map(|l| count_outside_quotes(l, delimiter, quote))
                .collect();
            score_counts(delimiter, &counts)
        })
        .collect()
}

fn score_counts(delimiter: u8, counts: &[usize]) -> DelimiterScore {
    let lines_present = counts.iter().filter(|&&c| c > 0).count();
    if counts.is_empty() || lines_present == 0 {
        return DelimiterScore {
            delimiter,
            modal_count: 0,
            consistency: 0.0,
            variance: 0.0,
            lines_present,
        };
    }

    // Modal non-zero count; the larger count wins a frequency tie.
    let mut freq: Vec<(usize, usize)> = Vec::new();
    for &c in counts.iter().filter(|&&c| c > 0) {
        match freq.iter_mut().find(|(v, _)| *v == c) {
            Some((_, f)) => *f += 1,
            None => freq.push((c, 1)),
        }
    }
    let (modal_count, modal_freq) = freq
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .unwrap_or((0, 0));

    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    let variance = counts
        .iter()
        .map(|&c| {
            let d = c as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    DelimiterScore {
        delimiter,
        modal_count,
        consistency: modal_freq as f64 / n,
        variance,
        lines_present,
    }
}

/// `true` when `a` should be preferred over `b`. Candidates are compared in priority order,
/// so an exact tie keeps the earlier one.
fn outranks(a: &DelimiterScore, b: &DelimiterScore) -> bool {
    if (a.consistency - b.consistency).abs() > DIALECT_TIE_EPSILON {
        return a.consistency > b.consistency;
    }
    if (a.variance - b.variance).abs() > DIALECT_TIE_EPSILON {
        return a.variance < b.variance;
    }
    false
}

/// Sniff the dialect of decoded `text`, looking at the first `sample_limit` non-blank lines.
pub fn sniff_dialect(text: &str, sample_limit: usize) -> NormalizeResult<DialectGuess> {
    let lines = sample_lines(text, sample_limit.max(1));
    let terminator = detect_terminator(text, sample_limit.max(1));

    if lines.len() <= 1 {
        let delimiter = lines
            .first()
            .and_then(|line| single_line_delimiter(line))
            .unwrap_or(DialectGuess::default().delimiter);
        let quote = infer_quote(&lines, delimiter);
        debug!(delimiter = %(delimiter as char), "single-line sample, using frequency pick");
        return Ok(DialectGuess {
            delimiter,
            quote,
            terminator,
        });
    }

    let unsniffable = || NormalizeError::UnsniffableDialect {
        message: format!(
            "no delimiter among ';' ',' '\\t' '|' is consistent on at least {:.0}% of {} sampled lines",
            MIN_DIALECT_CONSISTENCY * 100.0,
            lines.len()
        ),
    };

    let (best, quote) = match pick_delimiter(&lines, QUOTE_CANDIDATES[0]) {
        Some(first) => match infer_quote(&lines, first.delimiter) {
            // Delimiters inside single-quoted fields were counted as separators; score again.
            quote if quote != QUOTE_CANDIDATES[0] => match pick_delimiter(&lines, quote) {
                Some(rescored) => (rescored, quote),
                None => (first, QUOTE_CANDIDATES[0]),
            },
            quote => (first, quote),
        },
        None => {
            let quote = QUOTE_CANDIDATES[1];
            pick_delimiter(&lines, quote)
                .filter(|s| infer_quote(&lines, s.delimiter) == quote)
                .map(|s| (s, quote))
                .ok_or_else(unsniffable)?
        }
    };
    debug!(
        delimiter = %(best.delimiter as char),
        quote = %(quote as char),
        consistency = best.consistency,
        variance = best.variance,
        modal_count = best.modal_count,
        sampled = lines.len(),
        "dialect sniffed"
    );
    Ok(DialectGuess {
        delimiter: best.delimiter,
        quote,
        terminator,
    })
}

/// Most consistent delimiter under `quote`, or `None` when no candidate qualifies.
fn pick_delimiter(lines: &[&str], quote: u8) -> Option<DelimiterScore> {
    let mut best: Option<DelimiterScore> = None;
    for s in score_delimiters(lines, quote)
        .into_iter()
        .filter(|s| s.lines_present >= 2 && s.consistency >= MIN_DIALECT_CONSISTENCY)
    {
        match &best {
            Some(b) if !outranks(&s, b) => {}
            _ => best = Some(s),
        }
    }
    best
}

fn single_line_delimiter(line: &str) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for &d in &DELIMITER_CANDIDATES {
        let n = count_outside_quotes(line, d, b'"');
        if n > 0 && best.is_none_or(|(_, m)| n > m) {
            best = Some((d, n));
        }
    }
    best.map(|(d, _)| d)
}

/// Pick the quote character that most often wraps whole fields.
pub fn infer_quote(lines: &[&str], delimiter: u8) -> u8 {
    let delimiter = delimiter as char;
    let mut best = (QUOTE_CANDIDATES[0], 0usize);
    for &q in &QUOTE_CANDIDATES {
        let qc = q as char;
        let wrapped = lines
            .iter()
            .flat_map(|l| l.split(delimiter))
            .map(str::trim)
            .filter(|f| f.len() >= 2 && f.starts_with(qc) && f.ends_with(qc))
            .count();
        if wrapped > best.1 {
            best = (q, wrapped);
        }
    }
    best.0
}

/// Majority line terminator among the first `limit` line breaks.
pub fn detect_terminator(text: &str, limit: usize) -> LineTerminator {
    let (mut lf, mut crlf, mut cr) = (0usize, 0usize, 0usize);
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && lf + crlf + cr < limit {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                crlf += 1;
                i += 1;
            }
            b'\r' => cr += 1,
            b'\n' => lf += 1,
            _ => {}
        }
        i += 1;
    }

    if crlf >= lf && crlf >= cr && crlf > 0 {
        LineTerminator::CrLf
    } else if cr > lf {
        LineTerminator::Cr
    } else {
        LineTerminator::Lf
    }
}
