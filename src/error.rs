// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Reasons the ingestion gate refuses a document before any parsing happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("File too large: {size_bytes} bytes exceeds the {limit_bytes} byte limit")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Too many pages: estimated {estimated_pages}, maximum is {limit}")]
    TooManyPages { estimated_pages: usize, limit: usize },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Document could not be read: {0}")]
    Unreadable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("No scene headings detected in document")]
    NoStructureDetected,

    #[error("Text encoding not recognized: {0}")]
    InvalidEncoding(String),

    #[error("Text extraction failed: {0}")]
    TextExtraction(String),
}

/// Crate-wide error. Cloneable so a single failed computation can be handed to
/// every caller waiting on the same fingerprint.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document rejected: {0}")]
    Rejected(#[from] RejectionReason),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("File operation failed for {path}: {message}")]
    FileOperation { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn file_operation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOperation {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Rejections and parse failures are caused by the input and can be fixed
    /// by the uploader. Everything else is on our side.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Parse(_) | Self::Validation(_))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
