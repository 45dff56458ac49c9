//! Error types for the FFP vector store

use thiserror::Error;

use crate::indexer::IngestReport;

/// Result type alias for vector store operations
pub type Result<T> = std::result::Result<T, FfpError>;

/// Error types that can occur while embedding, indexing or searching
#[derive(Error, Debug)]
pub enum FfpError {
    /// Malformed input to this subsystem (empty text, k = 0, blank club).
    #[error("Validation error: {reason}")]
    Validation { reason: String },

    /// The embedding backend was unreachable or returned an error.
    #[error("Provider error{}: {message}", status_suffix(.status))]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("Index already exists: {name}")]
    IndexAlreadyExists { name: String },

    #[error("Index not found: {name}")]
    IndexNotFound { name: String },

    #[error("Index error: {0}")]
    Index(String),

    /// Records were written but the index could not be refreshed. The
    /// per-record outcome of the batch is kept in `report`.
    #[error("Refresh failed after indexing {} records: {source}", .report.success_count())]
    RefreshFailed {
        report: Box<IngestReport>,
        source: Box<FfpError>,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl FfpError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }

    /// Whether this error belongs to the index family. Vector faults raised
    /// while searching or storing count as index failures.
    pub fn is_index(&self) -> bool {
        match self {
            Self::RefreshFailed { source, .. } => source.is_index(),
            _ => matches!(
                self,
                Self::IndexAlreadyExists { .. }
                    | Self::IndexNotFound { .. }
                    | Self::Index(_)
                    | Self::DimensionMismatch { .. }
                    | Self::InvalidVector { .. }
            ),
        }
    }

    /// The batch report carried by an ingest that failed after writing.
    pub fn ingest_report(&self) -> Option<&IngestReport> {
        match self {
            Self::RefreshFailed { report, .. } => Some(report),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FfpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
