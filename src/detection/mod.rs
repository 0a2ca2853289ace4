//! Format detection for delimited text.
//!
//! Each detector is a pure scoring function over an immutable input, so thresholds and
//! tie-breaks can be tested in isolation:
//!
//! - [`encoding`]: raw bytes → [`crate::types::EncodingGuess`]
//! - [`dialect`]: decoded text → [`crate::types::DialectGuess`]
//! - [`preamble`]: per-record [`preamble::RecordShape`]s → [`preamble::HeaderLocation`]

pub mod dialect;
pub mod encoding;
pub mod preamble;

pub use dialect::{sniff_dialect, DEFAULT_SAMPLE_LINES, MIN_DIALECT_CONSISTENCY};
pub use encoding::{detect_encoding, detect_encoding_with, EncodingPolicy, MIN_ENCODING_CONFIDENCE};
pub use preamble::{locate_header, HeaderLocation, RecordShape, STABLE_RUN_LEN};
