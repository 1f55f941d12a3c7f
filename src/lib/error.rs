use std::io;

use thiserror::Error;

/// Failures reported by a [`crate::DocumentStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("batch of {size} writes exceeds the store limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("invalid document key `{0}`")]
    InvalidKey(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("store snapshot could not be (de)serialised: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the import, report and export operations.
///
/// Parse and validation errors are raised before any store call. A write
/// error carries the number of records committed by earlier chunks.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parse error in row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("parse error: missing column `{0}`")]
    MissingColumn(String),

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("chunk {chunk} failed after {imported} records were imported: {source}")]
    Write {
        imported: usize,
        chunk: usize,
        #[source]
        source: StoreError,
    },

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    pub fn parse(row: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            row,
            message: message.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for errors detected while reading input, before any write.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Parse { .. } | PipelineError::MissingColumn(_) | PipelineError::Csv(_)
        )
    }
}
