use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Boxed cause attached to format failures raised mid-pass.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Discriminant for [`PipelineError`], useful when callers only care about
/// which class of failure ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input file was absent when the run started.
    InputNotFound,
    /// The header was unusable or the clean-output pass hit an I/O failure.
    InputFormat,
    /// The stats document could not be written.
    OutputWrite,
    /// Generic I/O failure outside the clean-output pass.
    Io,
    /// The logging subscriber could not be installed.
    Logging,
}

/// Error type covering the run-level failures of the ingestion pipeline.
///
/// Every variant is terminal for the run. Per-record rejections are reported
/// as [`ValidationFailure`] values instead and never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Raised when the input file does not exist.
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    /// Raised when the input is structurally invalid or cannot be read or
    /// written while the clean-output pass is running.
    #[error("{message}")]
    InputFormat {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },

    /// Raised when the stats document cannot be written. The clean output is
    /// already complete at this point.
    #[error("failed to write stats JSON: {}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wrapper for IO failures outside the main pass, such as creating output
    /// directories.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl PipelineError {
    /// Builds a format error without an underlying cause.
    pub fn format(message: impl Into<String>) -> Self {
        PipelineError::InputFormat {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a format error that keeps `cause` in the source chain.
    pub fn format_with(message: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        PipelineError::InputFormat {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InputNotFound(_) => ErrorKind::InputNotFound,
            PipelineError::InputFormat { .. } => ErrorKind::InputFormat,
            PipelineError::OutputWrite { .. } => ErrorKind::OutputWrite,
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::Logging(_) => ErrorKind::Logging,
        }
    }
}

/// A recoverable, line-scoped rejection of a single input record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line_number}: {message}")]
pub struct ValidationFailure {
    /// 1-based position of the record in the file. The header is line 1, so
    /// data records start at 2.
    pub line_number: u64,
    /// Text of the first validation check the record failed.
    pub message: String,
}

impl ValidationFailure {
    pub fn new(line_number: u64, message: impl Into<String>) -> Self {
        Self {
            line_number,
            message: message.into(),
        }
    }
}
