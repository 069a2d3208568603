//! Job submission.

use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

use super::retry::{Retrier, RetryPolicy, Sleeper, ThreadSleeper};
use super::token::{idempotency_token, job_tag, DocumentRef};
use super::{DocumentAnalysisProvider, JobKind, NotificationTarget, SubmitRequest};

/// Where a poller is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Nothing submitted yet
    Idle,
    Submitting,
    /// The last attempt failed with a retryable error
    Retrying { attempt: u32 },
    Succeeded,
    PermanentlyFailed,
}

/// Options for job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Prefix of idempotency tokens and job tags
    pub token_prefix: String,

    /// Completion notification target
    pub notification: Option<NotificationTarget>,

    /// Analysis features requested for document analysis jobs
    pub feature_types: Vec<String>,

    pub kind: JobKind,
}

impl SubmitOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the token prefix from `text_detection_token_prefix`, keeping
    /// the default when unset.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(prefix) = env::var("text_detection_token_prefix") {
            if !prefix.trim().is_empty() {
                options.token_prefix = prefix.trim().to_string();
            }
        }
        options
    }

    /// Set the token prefix.
    pub fn with_token_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.token_prefix = prefix.into();
        self
    }

    /// Set the notification target.
    pub fn with_notification(mut self, topic: impl Into<String>, role: impl Into<String>) -> Self {
        self.notification = Some(NotificationTarget {
            topic: topic.into(),
            role: role.into(),
        });
        self
    }

    /// Set the analysis features.
    pub fn with_feature_types<I, T>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.feature_types = features.into_iter().map(Into::into).collect();
        self
    }

    /// Set the job kind.
    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            token_prefix: "blockdoc".to_string(),
            notification: None,
            feature_types: vec!["TABLES".to_string(), "FORMS".to_string()],
            kind: JobKind::DocumentAnalysis,
        }
    }
}

/// Record of an accepted job submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSubmission {
    pub job_id: String,
    pub kind: JobKind,
    pub bucket: String,
    pub key: String,
    /// Prefix under which the job's output is uploaded
    pub upload_prefix: String,
    pub document_name: String,
    pub document_type: String,
    pub job_tag: String,
    pub idempotency_token: String,
    pub submitted_at: DateTime<Utc>,
    /// Attempts needed, first one included
    pub attempts: u32,
}

/// Submits analysis jobs, retrying transient provider failures.
pub struct JobPoller<P, S = ThreadSleeper> {
    provider: P,
    retrier: Retrier<S>,
    state: PollerState,
}

impl<P: DocumentAnalysisProvider> JobPoller<P> {
    /// Create a poller with the default retry policy.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            retrier: Retrier::new(RetryPolicy::default(), ThreadSleeper),
            state: PollerState::Idle,
        }
    }
}

impl<P, S> JobPoller<P, S>
where
    P: DocumentAnalysisProvider,
    S: Sleeper,
{
    /// Set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.retrier.policy = policy;
        self
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> JobPoller<P, T> {
        JobPoller {
            provider: self.provider,
            retrier: Retrier {
                policy: self.retrier.policy,
                sleeper,
                cancel: self.retrier.cancel,
            },
            state: self.state,
        }
    }

    /// Stop issuing provider calls once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.retrier.cancel = Some(flag);
        self
    }

    /// Current state.
    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.retrier.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.retrier.sleeper
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Submit the document at `bucket`/`key` for analysis.
    ///
    /// Every attempt carries the same idempotency token. Non-retryable
    /// provider errors and exhausted budgets surface with the provider's
    /// code intact.
    pub fn submit(&mut self, bucket: &str, key: &str, options: &SubmitOptions) -> Result<JobSubmission> {
        let document = DocumentRef::parse(bucket, key)?;
        let request = SubmitRequest {
            kind: options.kind,
            bucket: document.bucket.clone(),
            key: document.key.clone(),
            notification: options.notification.clone(),
            idempotency_token: idempotency_token(&options.token_prefix, &document.key),
            job_tag: job_tag(&options.token_prefix, &document.name),
            feature_types: match options.kind {
                JobKind::DocumentAnalysis => options.feature_types.clone(),
                JobKind::TextDetection => Vec::new(),
            },
        };

        log::info!(
            "Submitting {} job for s3://{}/{} (token {})",
            request.kind,
            request.bucket,
            request.key,
            request.idempotency_token
        );

        self.state = PollerState::Submitting;
        let label = format!("Start{} {}", request.kind, request.key);
        let provider = &self.provider;
        let state = &mut self.state;
        let submitted = self.retrier.run(
            &label,
            |_| provider.start_job(&request),
            |attempt, _| *state = PollerState::Retrying { attempt },
        );

        let (job_id, attempts) = match submitted {
            Ok(submitted) => submitted,
            Err(err) => {
                self.state = PollerState::PermanentlyFailed;
                return Err(err);
            }
        };

        self.state = PollerState::Succeeded;
        log::info!("Started job {} after {} attempt(s)", job_id, attempts);

        Ok(JobSubmission {
            upload_prefix: document.upload_prefix(&job_id),
            job_id,
            kind: request.kind,
            bucket: request.bucket,
            key: request.key,
            document_name: document.name,
            document_type: document.document_type,
            job_tag: request.job_tag,
            idempotency_token: request.idempotency_token,
            submitted_at: Utc::now(),
            attempts,
        })
    }
}
