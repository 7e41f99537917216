//! Error types for lfasr operations.
//!
//! `ApiError` covers a single request at the transport boundary. `LfasrError` is what
//! public operations return; each variant is a distinct failure kind callers can branch on.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::StatusCode;

/// Failure of one request to the remote service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or timeout failure from the HTTP client
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded into the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The service answered with `ok != 0`
    #[error("service rejected request (err_no {err_no}): {message}")]
    Rejected { err_no: i64, message: String },
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http(_) => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Decode(_) | ApiError::Rejected { .. } => false,
        }
    }
}

/// Errors returned by lfasr operations.
#[derive(Debug, Error)]
pub enum LfasrError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported format '{extension}' for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("upload failed: {reason}")]
    Upload {
        reason: String,
        #[source]
        source: Option<ApiError>,
    },

    #[error(
        "timed out after {}s waiting for task {task_id} (last status: {})",
        .elapsed.as_secs(),
        describe_status(.last_status)
    )]
    Timeout {
        task_id: String,
        last_status: Option<StatusCode>,
        elapsed: Duration,
    },

    #[error("transcription failed for task {task_id}: {message}")]
    Transcription {
        task_id: String,
        status: Option<i64>,
        message: String,
    },

    #[error("stopped waiting for task {task_id} (last status: {})", describe_status(.last_status))]
    Cancelled {
        task_id: String,
        last_status: Option<StatusCode>,
    },

    #[error("audio extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_status(status: &Option<StatusCode>) -> String {
    match status {
        Some(s) => s.to_string(),
        None => "none observed".to_string(),
    }
}

/// Failure category, stable across releases and serialized into batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "UnsupportedFormatError")]
    UnsupportedFormat,
    #[serde(rename = "UploadError")]
    Upload,
    #[serde(rename = "TimeoutError")]
    Timeout,
    #[serde(rename = "TranscriptionError")]
    Transcription,
    #[serde(rename = "CancelledError")]
    Cancelled,
    #[serde(rename = "ExtractionError")]
    Extraction,
    #[serde(rename = "ApiError")]
    Api,
    #[serde(rename = "IoError")]
    Io,
}

impl LfasrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LfasrError::Configuration(_) => ErrorKind::Configuration,
            LfasrError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            LfasrError::Upload { .. } => ErrorKind::Upload,
            LfasrError::Timeout { .. } => ErrorKind::Timeout,
            LfasrError::Transcription { .. } => ErrorKind::Transcription,
            LfasrError::Cancelled { .. } => ErrorKind::Cancelled,
            LfasrError::Extraction(_) => ErrorKind::Extraction,
            LfasrError::Api(_) => ErrorKind::Api,
            LfasrError::Io(_) => ErrorKind::Io,
        }
    }

    /// Process exit code for command-line wrappers. 2 is reserved for usage errors.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Configuration => 3,
            ErrorKind::UnsupportedFormat => 4,
            ErrorKind::Upload => 5,
            ErrorKind::Timeout => 6,
            ErrorKind::Transcription => 7,
            ErrorKind::Cancelled => 8,
            ErrorKind::Extraction | ErrorKind::Api | ErrorKind::Io => 1,
        }
    }

    /// Remote task this failure belongs to, when one had been created
    pub fn task_id(&self) -> Option<&str> {
        match self {
            LfasrError::Timeout { task_id, .. }
            | LfasrError::Transcription { task_id, .. }
            | LfasrError::Cancelled { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    pub(crate) fn upload(reason: impl Into<String>, source: Option<ApiError>) -> Self {
        LfasrError::Upload {
            reason: reason.into(),
            source,
        }
    }
}

/// One batch item's failure as recorded in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&LfasrError> for BatchItemError {
    fn from(err: &LfasrError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = LfasrError> = std::result::Result<T, E>;
