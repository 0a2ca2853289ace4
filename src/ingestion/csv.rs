//! CSV normalization: encoding → dialect → records → header → table.

use tracing::debug;

use crate::detection::encoding::{decode, detect_encoding_with};
use crate::detection::preamble::{locate_header, HeaderLocation, RecordShape};
use crate::detection::sniff_dialect;
use crate::error::{NormalizeError, NormalizeResult};
use crate::types::{positional_name, DialectGuess, NormalizedTable, QualityFlags, TableSource};

use super::unified::NormalizeOptions;

/// Normalize the bytes of a CSV file into a [`NormalizedTable`].
///
/// Steps:
///
/// - detect the encoding and decode (falling back on malformed input, flagged)
/// - sniff delimiter, quote and line terminator over the sample window
/// - split records with the sniffed dialect
/// - skip preamble records until the field count stabilizes (or go headerless, flagged)
/// - pad/truncate rows to the header width (flagged)
pub fn normalize_csv(bytes: &[u8], options: &NormalizeOptions) -> NormalizeResult<NormalizedTable> {
    if bytes.is_empty() {
        return Err(NormalizeError::EmptyFile);
    }

    let guess = detect_encoding_with(bytes, &options.encoding)?;
    let decoded = decode(bytes, guess, &options.encoding);
    if decoded.text.trim().is_empty() {
        return Err(NormalizeError::EmptyFile);
    }

    let dialect = sniff_dialect(&decoded.text, options.sample_lines)?;
    let mut records = read_records(&decoded.text, &dialect)?;
    if records.is_empty() {
        return Err(NormalizeError::EmptyFile);
    }

    let shapes: Vec<RecordShape> = records.iter().map(|r| RecordShape::of(r.as_slice())).collect();
    let location = locate_header(&shapes, options.sample_lines, options.stable_run_len);

    let mut quality = QualityFlags {
        low_confidence_encoding: decoded.guess.low_confidence,
        decode_error: decoded.decode_error,
        ..Default::default()
    };

    let (header, data) = match location {
        HeaderLocation::Header { index, column_count } => {
            let mut data = records.split_off(index);
            let mut header = data.remove(0);
            header.truncate(column_count);
            (header, data)
        }
        HeaderLocation::Headerless { column_count } => {
            quality.no_header_detected = true;
            let header = (0..column_count).map(positional_name).collect();
            (header, records)
        }
    };

    debug!(
        preamble = location.preamble_len(),
        columns = header.len(),
        records = data.len(),
        "csv records split"
    );

    Ok(NormalizedTable::assemble(
        header,
        data,
        quality,
        TableSource::Csv {
            encoding: decoded.guess,
            dialect,
            preamble_lines: location.preamble_len(),
        },
    ))
}

/// Split decoded text into records using `dialect`.
///
/// Records may have different lengths. Records whose every field is blank are dropped here so
/// they do not interrupt field-count runs.
pub fn read_records(text: &str, dialect: &DialectGuess) -> NormalizeResult<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        out.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_records_honours_quotes_and_embedded_newlines() {
        let dialect = DialectGuess::default();
        let text = "a;b\n\"x;y\";\"multi\nline\"\n;;\n1;2\n";
        let records = read_records(text, &dialect).unwrap();
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["x;y".to_string(), "multi\nline".to_string()],
                vec!["1".to_string(), "2".to_string()],
            ]
        );
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        let err = normalize_csv(b" \r\n\n", &NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyFile));
    }
}
