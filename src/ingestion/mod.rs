//! Normalization entrypoints and implementations.
//!
//! Most callers should use [`normalize`] (from [`unified`]) which:
//!
//! - picks the format from the declared extension (or you can override via [`NormalizeOptions`])
//! - normalizes the file into an in-memory [`crate::types::NormalizedTable`]
//! - optionally reports success/degraded/failure/alerts to a [`NormalizeObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;
pub mod unified;

pub use observability::{
    CompositeObserver, FileObserver, NormalizeContext, NormalizeObserver, NormalizeSeverity, NormalizeStats,
    StdErrObserver, TracingObserver,
};
pub use unified::{normalize, normalize_bytes, normalize_with_options, NormalizeOptions, SourceFormat};
