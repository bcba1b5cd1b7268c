use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for processing operations.
pub type ProcessingResult<T> = Result<T, ProcessingError>;

/// Error type returned by detection, transformation and the storage collaborators.
///
/// Malformed dates and numbers are not errors: they are coerced to null per field and counted in
/// [`crate::transform::TransformStats::coerced_fields`].
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Delimited-text decoding or output encoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The file extension does not belong to a supported platform.
    #[error("unsupported format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The input does not carry the columns a platform transformer needs.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A configuration file could not be parsed.
    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The input directory could not be watched.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// The configured text encoding label is not known to `encoding_rs`.
    #[error("unknown text encoding '{label}'")]
    Encoding { label: String },
}

impl ProcessingError {
    /// `true` for errors a watch loop should skip over without alerting.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }

    /// `true` for storage failures that may succeed on a later attempt with the same input.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Csv(e) => matches!(e.kind(), csv::ErrorKind::Io(_)),
            _ => false,
        }
    }
}
