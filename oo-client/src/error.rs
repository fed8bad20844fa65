use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when talking to an OpenObserve instance.
#[derive(Debug, Error)]
pub enum OpenObserveError {
    /// The server answered with a non-2xx status.
    #[error("Openobserve {action} returned {status}. Text: {body}")]
    Http {
        action: String,
        status: u16,
        body: String,
    },

    /// Network error (connection failed, timeout, TLS, etc.).
    #[error("Network error: {message}")]
    Network { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The SQL text was rejected by the local parser.
    #[error("Invalid SQL: {message}")]
    InvalidSql { message: String },

    /// The server accepted the request but refused the document.
    #[error("Openobserve index failed. {error}. document: {document}")]
    IndexFailed { error: String, document: String },

    /// The response did not have the expected shape.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// A field the operation depends on is missing from an object.
    #[error("Missing field '{field}' in {object_type} object")]
    MissingField { object_type: String, field: String },

    /// Caller supplied input failed validation.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The object type is not one the API exposes.
    #[error("Unknown object type: {0}")]
    UnknownObjectType(String),

    /// Converting records into a frame failed.
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Filesystem error while importing or exporting.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OpenObserveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OpenObserveError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the HTTP status when the server rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenObserveError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OpenObserveError {
    fn from(err: reqwest::Error) -> Self {
        OpenObserveError::Network {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for OpenObserveError {
    fn from(err: serde_json::Error) -> Self {
        OpenObserveError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<arrow::error::ArrowError> for OpenObserveError {
    fn from(err: arrow::error::ArrowError) -> Self {
        OpenObserveError::Frame {
            message: err.to_string(),
        }
    }
}

/// Result type for OpenObserve operations.
pub type Result<T> = std::result::Result<T, OpenObserveError>;
