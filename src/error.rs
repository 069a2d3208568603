//! Error types for blockdoc library.

use std::io;
use thiserror::Error;

/// Result type alias for blockdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while collecting and assembling documents.
///
/// Structural defects inside a page (dangling references, incomplete
/// cells) are not errors; they are recorded as
/// [`Diagnostic`](crate::model::Diagnostic)s on the document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The block stream does not start each page with its PAGE block.
    #[error("Malformed block stream: {0}")]
    MalformedStream(String),

    /// The provider reported an error that must not be retried.
    #[error("Provider error {code}: {message}")]
    ProviderPermanent {
        /// Provider error code, verbatim
        code: String,
        /// Provider error message
        message: String,
    },

    /// A retryable provider error persisted past the retry budget.
    #[error("Provider error {code} after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Code of the last provider error, verbatim
        code: String,
        /// Message of the last provider error
        message: String,
    },

    /// The job reached a terminal status other than success.
    #[error("Job {job_id} finished with status {status}: {message}")]
    JobFailed {
        job_id: String,
        status: String,
        message: String,
    },

    /// The caller abandoned the job.
    #[error("Job {0} was cancelled")]
    Cancelled(String),

    /// Invalid caller input (document key, notification, page range).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error while persisting extracted content.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Error during rendering (text, JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// A background worker panicked or was aborted.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl Error {
    /// The provider error code carried by this error, if any.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            Error::ProviderPermanent { code, .. } | Error::RetriesExhausted { code, .. } => {
                Some(code)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MalformedStream("block w1 precedes the first PAGE block".to_string());
        assert_eq!(
            err.to_string(),
            "Malformed block stream: block w1 precedes the first PAGE block"
        );

        let err = Error::RetriesExhausted {
            attempts: 5,
            code: "ThrottlingException".to_string(),
            message: "Rate exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Provider error ThrottlingException after 5 attempts: Rate exceeded"
        );
    }

    #[test]
    fn test_provider_code() {
        let err = Error::ProviderPermanent {
            code: "AccessDeniedException".to_string(),
            message: "denied".to_string(),
        };
        assert_eq!(err.provider_code(), Some("AccessDeniedException"));
        assert_eq!(Error::Cancelled("job-1".to_string()).provider_code(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
