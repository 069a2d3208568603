//! Idempotency tokens, job tags and document keys.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Longest token or tag the provider accepts.
const MAX_TOKEN_LEN: usize = 64;

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap())
}

/// Replace characters the provider rejects and cap the length.
///
/// Over-long values keep a readable head and end in the MD5 digest of
/// `source`, so distinct inputs stay distinct. With `mark_replaced`, a value
/// that needed any replacement gets the digest too.
fn sanitize(raw: &str, source: &str, mark_replaced: bool) -> String {
    let clean = disallowed().replace_all(raw, "_").into_owned();
    let replaced = clean != raw;
    if clean.len() <= MAX_TOKEN_LEN && !(mark_replaced && replaced) {
        return clean;
    }

    let digest = format!("{:x}", md5::compute(source.as_bytes()));
    let head_len = (MAX_TOKEN_LEN - digest.len() - 1).min(clean.len());
    format!("{}-{}", &clean[..head_len], digest)
}

/// Derive the idempotency token for a document.
///
/// The result depends only on `prefix` and `key`, so resubmitting the same
/// document collapses onto the job that is already running. Keys with
/// characters outside `[A-Za-z0-9_-/.]` end in a digest of the raw key, so
/// `a b.pdf` and `a_b.pdf` never share a token.
pub fn idempotency_token(prefix: &str, key: &str) -> String {
    let source = format!("{}-{}", prefix, key);
    let mapped = format!("{}-{}", prefix, key.replace('/', "_").replace('.', "-"));
    sanitize(&mapped, &source, true)
}

/// Derive the job tag echoed back in completion notifications.
pub fn job_tag(prefix: &str, document_name: &str) -> String {
    let tag = format!("{}-{}", prefix, document_name);
    sanitize(&tag, &tag, false)
}

/// A document stored under a bucket key, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRef {
    pub bucket: String,
    pub key: String,
    /// Directory part of the key, if any
    pub path: Option<String>,
    /// File name without extension
    pub name: String,
    /// Upper-cased extension (e.g. `PDF`), empty if none
    pub document_type: String,
}

impl DocumentRef {
    /// Split a bucket key into directory, name and type.
    pub fn parse(bucket: &str, key: &str) -> Result<Self> {
        let key = key.trim();
        if bucket.trim().is_empty() {
            return Err(Error::InvalidInput("bucket name is empty".to_string()));
        }
        if key.is_empty() || key.ends_with('/') {
            return Err(Error::InvalidInput(format!(
                "document key {:?} does not name a file",
                key
            )));
        }

        let (path, file_name) = match key.rsplit_once('/') {
            Some((dir, file)) => (Some(dir.to_string()), file),
            None => (None, key),
        };
        let (name, document_type) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_uppercase()),
            _ => (file_name.to_string(), String::new()),
        };

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            path,
            name,
            document_type,
        })
    }

    /// Prefix under which results for `job_id` are uploaded.
    pub fn upload_prefix(&self, job_id: &str) -> String {
        match &self.path {
            Some(dir) => format!("{}/{}", dir, job_id),
            None => job_id.to_string(),
        }
    }
}
