//! Document analysis provider protocol.
//!
//! The provider itself is an external service reached through
//! [`DocumentAnalysisProvider`]. This module drives it: [`JobPoller`]
//! submits jobs, [`ResultCollector`] pages through results, and both share
//! the retry/backoff rules in [`RetryPolicy`].

mod collector;
mod poller;
mod replay;
mod retry;
mod token;

pub use collector::{
    CollectOutcome, CollectedResult, CollectorOptions, CollectorState, ResultCollector, ResultPages,
};
pub use poller::{JobPoller, JobSubmission, PollerState, SubmitOptions};
pub use replay::{parse_result_pages, ReplayProvider, REPLAY_JOB_ID};
pub use retry::{ErrorClass, RetryDecision, RetryPolicy, Sleeper, ThreadSleeper};
pub use token::{idempotency_token, job_tag, DocumentRef};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Block;

/// An error reported by the provider, with its code kept verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Provider error code (e.g. `ThrottlingException`)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ProviderError {
    /// Create a provider error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classify this error's code.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::of(&self.code)
    }

    /// Check if the error may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

/// Which provider API a job uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Text detection (pages, lines, words)
    TextDetection,
    /// Document analysis (adds tables, cells and forms)
    #[default]
    DocumentAnalysis,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::TextDetection => write!(f, "TextDetection"),
            JobKind::DocumentAnalysis => write!(f, "DocumentAnalysis"),
        }
    }
}

/// Status of a provider job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed,
    PartialSuccess,
    /// Any other status, kept verbatim
    Other(String),
}

impl JobStatus {
    /// Check if the job has stopped running.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }

    /// Check if the job finished successfully.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::PartialSuccess => "PARTIAL_SUCCESS",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "IN_PROGRESS" => JobStatus::InProgress,
            "SUCCEEDED" => JobStatus::Succeeded,
            "FAILED" => JobStatus::Failed,
            "PARTIAL_SUCCESS" => JobStatus::PartialSuccess,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-reported document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentMetadata {
    /// Number of pages in the analysed document
    #[serde(default)]
    pub pages: Option<u32>,
}

/// One paginated fragment of a job's results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultPage {
    /// Blocks of this fragment; `None` when the response has no `Blocks` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,

    /// Continuation token; `None` on the last fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl ResultPage {
    /// Create a fragment holding blocks.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Some(blocks),
            ..Default::default()
        }
    }

    /// Set the continuation token and return self.
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    /// Set the declared page count and return self.
    pub fn with_declared_pages(mut self, pages: u32) -> Self {
        self.document_metadata = Some(DocumentMetadata { pages: Some(pages) });
        self
    }

    /// Page count declared in the response metadata.
    pub fn declared_pages(&self) -> Option<u32> {
        self.document_metadata.as_ref().and_then(|m| m.pages)
    }

    /// Check if the response carried a `Blocks` field.
    pub fn has_blocks(&self) -> bool {
        self.blocks.is_some()
    }
}

/// Where the provider should announce job completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    /// Topic the completion message is published to
    pub topic: String,
    /// Role the provider assumes to publish
    pub role: String,
}

/// A job submission as handed to the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    pub kind: JobKind,
    pub bucket: String,
    pub key: String,
    pub notification: Option<NotificationTarget>,
    pub idempotency_token: String,
    pub job_tag: String,
    /// Analysis features (e.g. `TABLES`, `FORMS`); unused for text detection
    pub feature_types: Vec<String>,
}

/// A request for one fragment of a job's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRequest<'a> {
    pub kind: JobKind,
    pub job_id: &'a str,
    pub max_results: u32,
    pub next_token: Option<&'a str>,
}

/// The external document analysis service.
pub trait DocumentAnalysisProvider {
    /// Start an asynchronous job and return its id.
    fn start_job(&self, request: &SubmitRequest) -> std::result::Result<String, ProviderError>;

    /// Fetch one fragment of a job's results.
    fn get_result_page(
        &self,
        request: &ResultRequest<'_>,
    ) -> std::result::Result<ResultPage, ProviderError>;
}

impl<P: DocumentAnalysisProvider + ?Sized> DocumentAnalysisProvider for &P {
    fn start_job(&self, request: &SubmitRequest) -> std::result::Result<String, ProviderError> {
        (**self).start_job(request)
    }

    fn get_result_page(
        &self,
        request: &ResultRequest<'_>,
    ) -> std::result::Result<ResultPage, ProviderError> {
        (**self).get_result_page(request)
    }
}

impl<P: DocumentAnalysisProvider + ?Sized> DocumentAnalysisProvider for Arc<P> {
    fn start_job(&self, request: &SubmitRequest) -> std::result::Result<String, ProviderError> {
        (**self).start_job(request)
    }

    fn get_result_page(
        &self,
        request: &ResultRequest<'_>,
    ) -> std::result::Result<ResultPage, ProviderError> {
        (**self).get_result_page(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_page_from_json() {
        let json = r#"{
            "JobStatus": "SUCCEEDED",
            "NextToken": "abc",
            "DocumentMetadata": {"Pages": 3},
            "Blocks": [{"BlockType": "PAGE", "Id": "p1", "Page": 1}]
        }"#;
        let page: ResultPage = serde_json::from_str(json).unwrap();

        assert_eq!(page.job_status, Some(JobStatus::Succeeded));
        assert_eq!(page.next_token.as_deref(), Some("abc"));
        assert_eq!(page.declared_pages(), Some(3));
        assert_eq!(page.blocks.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_result_page_without_blocks() {
        let page: ResultPage = serde_json::from_str(r#"{"JobStatus": "SUCCEEDED"}"#).unwrap();
        assert!(!page.has_blocks());
        assert_eq!(page.declared_pages(), None);
    }

    #[test]
    fn test_job_status_round_trip() {
        assert_eq!(JobStatus::from("FAILED".to_string()), JobStatus::Failed);
        assert_eq!(
            JobStatus::from("ERROR".to_string()),
            JobStatus::Other("ERROR".to_string())
        );
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::PartialSuccess.is_terminal());
        assert_eq!(JobStatus::Succeeded.to_string(), "SUCCEEDED");
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new("ThrottlingException", "Rate exceeded");
        assert_eq!(err.to_string(), "ThrottlingException: Rate exceeded");
        assert!(err.is_retryable());
        assert!(!ProviderError::new("AccessDeniedException", "").is_retryable());
    }
}
