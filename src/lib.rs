//! PermitBase Indexed CSV Query Engine
//!
//! Fast, repeatable predicate queries over a large, append-only CSV export
//! of building-permit filings. Tokenization is amortized by persisting a
//! row-offset index to a `<csv>.idx` sidecar, memory-mapping it on open,
//! and evaluating a compositional predicate tree directly on unparsed field
//! slices. Decoding into a typed [`PermitRecord`] happens only for rows
//! that match.

pub mod csv;
pub mod query;
pub mod record;
pub mod schema;

// Re-export main types
pub use csv::{IndexedFile, RowIndex};
pub use query::{Literal, Predicate};
pub use record::{parse_row, PermitRecord};
pub use schema::{Catalog, ColumnCategory};

use std::path::PathBuf;

/// Query engine error type
#[derive(Debug, thiserror::Error)]
pub enum PermitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open CSV {path}: {source}")]
    CsvOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write index {path}: {source}")]
    IndexWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to map index {path}: {source}")]
    IndexMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Literal type mismatch: column {column} is {category:?}")]
    LiteralTypeMismatch {
        column: String,
        category: ColumnCategory,
    },

    #[error("Range is not supported for boolean column: {0}")]
    UnsupportedRangeCategory(String),

    #[error("Row index out of range: {0}")]
    RowOutOfRange(u64),

    #[error("Row parse error: {0}")]
    RowParse(String),
}

pub type Result<T> = std::result::Result<T, PermitError>;
