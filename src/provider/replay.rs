//! A provider that serves recorded responses.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use serde::Deserialize;

use crate::error::Result;

use super::{DocumentAnalysisProvider, ProviderError, ResultPage, ResultRequest, SubmitRequest};

/// Job id handed out by [`ReplayProvider`] unless overridden.
pub const REPLAY_JOB_ID: &str = "replay-job";

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ResultPage>),
    One(Box<ResultPage>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<ResultPage> {
        match self {
            OneOrMany::Many(pages) => pages,
            OneOrMany::One(page) => vec![*page],
        }
    }
}

/// Parse recorded result fragments: one response object or an array of them.
pub fn parse_result_pages(json: &str) -> Result<Vec<ResultPage>> {
    let pages: OneOrMany = serde_json::from_str(json)?;
    Ok(pages.into_vec())
}

/// Serves recorded result fragments as if they came from a running job.
///
/// Fragments are chained in the order given. A fragment without a
/// `NextToken` (other than the last) gets a synthetic `replay-N` token; the
/// last fragment never carries one.
#[derive(Debug)]
pub struct ReplayProvider {
    job_id: String,
    pages: Vec<ResultPage>,
    tokens: HashMap<String, usize>,
    submissions: Mutex<Vec<SubmitRequest>>,
}

impl ReplayProvider {
    /// Create a provider serving `pages` in order.
    pub fn new(mut pages: Vec<ResultPage>) -> Self {
        let mut tokens = HashMap::new();
        let last = pages.len().saturating_sub(1);

        for (i, page) in pages.iter_mut().enumerate() {
            if i == last {
                page.next_token = None;
                continue;
            }
            let token = page
                .next_token
                .get_or_insert_with(|| format!("replay-{}", i + 1))
                .clone();
            tokens.insert(token, i + 1);
        }

        Self {
            job_id: REPLAY_JOB_ID.to_string(),
            pages,
            tokens,
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Parse a recorded response, either one object or an array of them.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(parse_result_pages(json)?))
    }

    /// Load recorded responses from files, concatenated in order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut pages = Vec::new();
        for path in paths {
            let content = fs::read_to_string(path.as_ref())?;
            pages.extend(parse_result_pages(&content)?);
        }
        log::debug!("Loaded {} recorded fragments", pages.len());
        Ok(Self::new(pages))
    }

    /// Use a different job id.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    /// The job id this provider answers to.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Number of recorded fragments.
    pub fn fragment_count(&self) -> usize {
        self.pages.len()
    }

    /// Submission requests received so far.
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        match self.submissions.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DocumentAnalysisProvider for ReplayProvider {
    fn start_job(&self, request: &SubmitRequest) -> std::result::Result<String, ProviderError> {
        match self.submissions.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        Ok(self.job_id.clone())
    }

    fn get_result_page(
        &self,
        request: &ResultRequest<'_>,
    ) -> std::result::Result<ResultPage, ProviderError> {
        if request.job_id != self.job_id {
            return Err(ProviderError::new(
                "InvalidJobIdException",
                format!("unknown job {}", request.job_id),
            ));
        }

        let position = match request.next_token {
            None => 0,
            Some(token) => *self.tokens.get(token).ok_or_else(|| {
                ProviderError::new(
                    "InvalidParameterException",
                    format!("unknown NextToken {}", token),
                )
            })?,
        };

        Ok(self.pages.get(position).cloned().unwrap_or_default())
    }
}
