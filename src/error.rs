//! Error taxonomy for the table pipeline.
//!
//! Every variant is unrecoverable: a run that loses one input file would
//! publish a silently biased table, so failures propagate to `main`.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, shaping, or persisting tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// A required per-run result file does not exist.
    #[error("missing input file: {}", path.display())]
    MissingInputFile { path: PathBuf },

    /// A file exists but could not be read as a table, or holds a value
    /// that cannot be interpreted.
    #[error("malformed input in {origin}: {reason}")]
    MalformedInput { origin: String, reason: String },

    /// A column the pipeline depends on is absent.
    #[error("column `{column}` not found in {context}")]
    SchemaMismatch { column: String, context: String },

    /// An output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dataframe operation failed.
    #[error("{context}: {source}")]
    Frame {
        context: String,
        #[source]
        source: PolarsError,
    },
}

impl TableError {
    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>, context: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            column: column.into(),
            context: context.into(),
        }
    }

    /// Adapter for `map_err` on polars results.
    pub fn frame(context: impl Into<String>) -> impl FnOnce(PolarsError) -> Self {
        let context = context.into();
        move |source| Self::Frame { context, source }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
