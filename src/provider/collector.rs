//! Paginated result retrieval.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::Block;

use super::retry::{env_u32, Retrier, RetryPolicy, Sleeper, ThreadSleeper};
use super::{DocumentAnalysisProvider, JobKind, JobStatus, ResultPage, ResultRequest};

/// Options for result collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOptions {
    /// Maximum blocks requested per fragment
    pub max_results: u32,

    /// Which result API to read from
    pub kind: JobKind,

    /// Status checks made by [`ResultCollector::await_completion`]
    pub max_status_checks: u32,
}

impl CollectorOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `max_results` from the environment, keeping defaults otherwise.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();
        if let Some(max_results) = env_u32("max_results")? {
            options.max_results = max_results;
        }
        Ok(options)
    }

    /// Set the fragment size.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the job kind.
    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the number of status checks before giving up on a running job.
    pub fn with_max_status_checks(mut self, checks: u32) -> Self {
        self.max_status_checks = checks;
        self
    }
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            max_results: 1000,
            kind: JobKind::DocumentAnalysis,
            max_status_checks: 120,
        }
    }
}

/// Where a collector is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Fetching,
    Merging,
    Done,
    Failed,
}

/// How collection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    /// The last fragment had no continuation token
    Complete,
    /// A fragment had no `Blocks` field; the document is unreadable or empty
    Empty,
}

/// The merged output of a job's result fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedResult {
    pub job_id: Option<String>,

    /// Blocks of every fragment, in fragment order
    pub blocks: Vec<Block>,

    /// Page count declared by the provider, 0 if never reported
    pub declared_pages: u32,

    /// Number of fragments merged
    pub fragments: usize,

    pub outcome: CollectOutcome,
}

impl CollectedResult {
    /// Create an empty result.
    pub fn new(job_id: Option<String>) -> Self {
        Self {
            job_id,
            blocks: Vec::new(),
            declared_pages: 0,
            fragments: 0,
            outcome: CollectOutcome::Complete,
        }
    }

    /// Merge already fetched fragments in order.
    ///
    /// Stops at the first fragment without a `Blocks` field, as a live
    /// collection would.
    pub fn from_pages(pages: Vec<ResultPage>) -> Self {
        let mut result = Self::new(None);
        for page in pages {
            if !result.push(page) {
                break;
            }
        }
        result
    }

    /// Append one fragment. Returns `false` if it had no `Blocks` field.
    pub fn push(&mut self, page: ResultPage) -> bool {
        if let Some(pages) = page.declared_pages() {
            self.declared_pages = pages;
        }
        match page.blocks {
            Some(blocks) => {
                self.blocks.extend(blocks);
                self.fragments += 1;
                true
            }
            None => {
                self.outcome = CollectOutcome::Empty;
                false
            }
        }
    }

    /// Append everything `other` collected after this result.
    ///
    /// A result that already ended on an empty fragment takes nothing more,
    /// matching a single pass over the same fragments.
    pub fn merge(mut self, other: CollectedResult) -> Self {
        if self.job_id.is_none() {
            self.job_id = other.job_id.clone();
        }
        if self.outcome == CollectOutcome::Empty {
            return self;
        }

        self.blocks.extend(other.blocks);
        self.fragments += other.fragments;
        if other.declared_pages > 0 {
            self.declared_pages = other.declared_pages;
        }
        if other.outcome == CollectOutcome::Empty {
            self.outcome = CollectOutcome::Empty;
        }
        self
    }

    /// Check if no blocks were collected.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Lazily fetched result fragments of one job.
///
/// Each call to `next` requests the fragment named by the previous
/// continuation token. The sequence ends after a fragment without a token,
/// a fragment without blocks, or an error. It cannot be restarted.
pub struct ResultPages<'a, P, S> {
    provider: &'a P,
    retrier: &'a Retrier<S>,
    options: &'a CollectorOptions,
    job_id: &'a str,
    next_token: Option<String>,
    finished: bool,
}

impl<'a, P, S> ResultPages<'a, P, S>
where
    P: DocumentAnalysisProvider,
    S: Sleeper,
{
    fn new(
        provider: &'a P,
        retrier: &'a Retrier<S>,
        options: &'a CollectorOptions,
        job_id: &'a str,
    ) -> Self {
        Self {
            provider,
            retrier,
            options,
            job_id,
            next_token: None,
            finished: false,
        }
    }
}

impl<P, S> Iterator for ResultPages<'_, P, S>
where
    P: DocumentAnalysisProvider,
    S: Sleeper,
{
    type Item = Result<ResultPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let request = ResultRequest {
            kind: self.options.kind,
            job_id: self.job_id,
            max_results: self.options.max_results,
            next_token: self.next_token.as_deref(),
        };
        let provider = self.provider;
        let fetched = self.retrier.run(
            self.job_id,
            |_| provider.get_result_page(&request),
            |_, _| {},
        );

        match fetched {
            Ok((page, _)) => {
                self.next_token = page.next_token.clone();
                self.finished = self.next_token.is_none() || !page.has_blocks();
                Some(Ok(page))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

/// Collects every result fragment of a finished job into one block stream.
pub struct ResultCollector<P, S = ThreadSleeper> {
    provider: P,
    retrier: Retrier<S>,
    options: CollectorOptions,
    state: CollectorState,
}

impl<P: DocumentAnalysisProvider> ResultCollector<P> {
    /// Create a collector with default options and policy.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            retrier: Retrier::new(RetryPolicy::default(), ThreadSleeper),
            options: CollectorOptions::default(),
            state: CollectorState::Fetching,
        }
    }
}

impl<P, S> ResultCollector<P, S>
where
    P: DocumentAnalysisProvider,
    S: Sleeper,
{
    /// Set collection options.
    pub fn with_options(mut self, options: CollectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.retrier.policy = policy;
        self
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> ResultCollector<P, T> {
        ResultCollector {
            provider: self.provider,
            retrier: Retrier {
                policy: self.retrier.policy,
                sleeper,
                cancel: self.retrier.cancel,
            },
            options: self.options,
            state: self.state,
        }
    }

    /// Stop issuing provider calls once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.retrier.cancel = Some(flag);
        self
    }

    /// Current state.
    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Iterate over the job's fragments without merging them.
    pub fn pages<'a>(&'a self, job_id: &'a str) -> ResultPages<'a, P, S> {
        ResultPages::new(&self.provider, &self.retrier, &self.options, job_id)
    }

    /// Fetch and merge every fragment of `job_id`.
    pub fn collect(&mut self, job_id: &str) -> Result<CollectedResult> {
        self.state = CollectorState::Fetching;
        let mut result = CollectedResult::new(Some(job_id.to_string()));
        let pages = ResultPages::new(&self.provider, &self.retrier, &self.options, job_id);

        for page in pages {
            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    self.state = CollectorState::Failed;
                    return Err(err);
                }
            };

            if let Some(status) = &page.job_status {
                if matches!(status, JobStatus::Failed) {
                    self.state = CollectorState::Failed;
                    return Err(Error::JobFailed {
                        job_id: job_id.to_string(),
                        status: status.to_string(),
                        message: page.status_message.clone().unwrap_or_default(),
                    });
                }
            }

            self.state = CollectorState::Merging;
            if !result.push(page) {
                log::info!(
                    "Job {}: fragment {} has no blocks, treating document as empty",
                    job_id,
                    result.fragments + 1
                );
                break;
            }
            log::debug!(
                "Job {}: merged fragment {} ({} blocks so far)",
                job_id,
                result.fragments,
                result.blocks.len()
            );
            self.state = CollectorState::Fetching;
        }

        self.state = CollectorState::Done;
        log::info!(
            "Job {}: collected {} blocks from {} fragments ({} pages declared)",
            job_id,
            result.blocks.len(),
            result.fragments,
            result.declared_pages
        );
        Ok(result)
    }

    /// Poll the job's status until it stops running.
    ///
    /// Waits one base interval between checks. A `FAILED` job, or one
    /// still running after `max_status_checks` checks, is an error.
    pub fn await_completion(&mut self, job_id: &str) -> Result<JobStatus> {
        let checks = self.options.max_status_checks.max(1);

        for check in 1..=checks {
            let mut pages = ResultPages::new(&self.provider, &self.retrier, &self.options, job_id);
            let page = match pages.next() {
                Some(Ok(page)) => page,
                Some(Err(err)) => {
                    self.state = CollectorState::Failed;
                    return Err(err);
                }
                None => break,
            };

            let status = page.job_status.unwrap_or(JobStatus::Succeeded);
            match status {
                JobStatus::InProgress => {
                    log::debug!("Job {} still running (check {}/{})", job_id, check, checks);
                    if check < checks {
                        self.retrier.sleeper.sleep(self.retrier.policy.base_interval);
                    }
                }
                JobStatus::Succeeded | JobStatus::PartialSuccess => return Ok(status),
                other => {
                    self.state = CollectorState::Failed;
                    return Err(Error::JobFailed {
                        job_id: job_id.to_string(),
                        status: other.to_string(),
                        message: page.status_message.unwrap_or_default(),
                    });
                }
            }
        }

        self.state = CollectorState::Failed;
        Err(Error::JobFailed {
            job_id: job_id.to_string(),
            status: JobStatus::InProgress.to_string(),
            message: format!("still running after {} status checks", checks),
        })
    }
}
