//! `tabular-normalizer` turns heterogeneous tabular exports (CSV, XLS, XLSX) into a uniform
//! in-memory [`types::NormalizedTable`]: one header row, data rows of the same width.
//!
//! The primary entrypoint is [`ingestion::normalize`], which picks the format from the file's
//! declared extension (or you can force a format via [`ingestion::NormalizeOptions`]).
//!
//! ## What gets detected
//!
//! For delimited text nothing is taken on trust:
//!
//! - **Encoding**: UTF-8 vs Windows-1252 (Latin-1 superset), scored over a bounded sample.
//!   A byte-order mark wins outright. Below the confidence threshold the Windows-1252 fallback
//!   is used and [`types::QualityFlags::low_confidence_encoding`] is set.
//! - **Dialect**: delimiter among `;`, `,`, tab and `|`, chosen by per-line count consistency.
//!   Exact ties go to `;`, the common separator of European exports.
//! - **Preamble**: metadata lines above the table are skipped; the header is the first record
//!   that starts a run of records with a stable field count. Trailing empty fields may be
//!   padded or dropped to fit, and a `key;value` block cut off by a title line is skipped when
//!   a wider table follows it.
//!
//! Workbooks are read with `calamine` (feature `excel`, on by default). Only the first sheet
//! is read.
//!
//! Degraded-but-usable results are returned as tables with [`types::QualityFlags`] raised.
//! Unusable inputs are returned as an [`IngestionFailure`] with a [`FailureKind`].
//!
//! ## Quick example
//!
//! ```rust
//! use tabular_normalizer::ingestion::normalize;
//! use tabular_normalizer::types::RawFile;
//!
//! let raw = RawFile::new("prelevements.csv", b"Date;Montant\n2024-01-02;10,50\n2024-01-03;7\n".to_vec());
//! let table = normalize(&raw).unwrap();
//! assert_eq!(table.header(), ["Date", "Montant"]);
//! assert_eq!(table.rows()[0], ["2024-01-02", "10,50"]);
//! assert!(!table.quality().is_degraded());
//! ```
//!
//! ## Batches
//!
//! ```no_run
//! use tabular_normalizer::execution::{BatchEngine, BatchOptions};
//! use tabular_normalizer::report::{inspection_rows, to_json};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = BatchEngine::new(BatchOptions::default())?;
//! let outcomes = engine.inspect_directory("exports/", true)?;
//! println!("{}", to_json(&inspection_rows(&outcomes))?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: unified entrypoint, CSV/Excel normalizers, observers
//! - [`detection`]: encoding, dialect and preamble detectors
//! - [`types`]: raw file, detection results, quality flags, normalized table
//! - [`execution`]: parallel batch normalization and directory scanning
//! - [`report`]: flat per-file summaries
//! - [`error`]: error types used across normalization

pub mod detection;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod report;
pub mod types;

pub use error::{FailureKind, IngestionFailure, NormalizeError, NormalizeResult};
pub use ingestion::normalize;
