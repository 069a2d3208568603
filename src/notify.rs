//! Job completion notifications.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::{DocumentRef, JobStatus};

/// Where the analysed document lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocation {
    #[serde(rename = "S3ObjectName")]
    pub object_name: String,
    #[serde(rename = "S3Bucket")]
    pub bucket: String,
}

/// Message published by the provider when a job stops running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionNotification {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub job_tag: Option<String>,
    #[serde(rename = "API", default)]
    pub api: Option<String>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub document_location: DocumentLocation,
}

#[derive(Deserialize)]
struct SnsEvent {
    #[serde(rename = "Records", default)]
    records: Vec<SnsRecord>,
}

#[derive(Deserialize)]
struct SnsRecord {
    #[serde(rename = "Sns")]
    sns: SnsMessage,
}

#[derive(Deserialize)]
struct SnsMessage {
    #[serde(rename = "Message")]
    message: String,
}

impl CompletionNotification {
    /// Parse a bare notification message.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse every notification carried by a topic delivery envelope.
    pub fn from_sns_event(json: &str) -> Result<Vec<Self>> {
        let event: SnsEvent = serde_json::from_str(json)?;
        if event.records.is_empty() {
            return Err(Error::InvalidInput("event has no Records".to_string()));
        }
        event
            .records
            .iter()
            .map(|record| Self::from_json(&record.sns.message))
            .collect()
    }

    /// Parse either form: a bare message or an envelope.
    pub fn parse_any(json: &str) -> Result<Vec<Self>> {
        match Self::from_json(json) {
            Ok(notification) => Ok(vec![notification]),
            Err(_) => Self::from_sns_event(json),
        }
    }

    /// Check if the job finished successfully.
    pub fn is_succeeded(&self) -> bool {
        self.status.is_succeeded()
    }

    /// The analysed document.
    pub fn document(&self) -> Result<DocumentRef> {
        DocumentRef::parse(
            &self.document_location.bucket,
            &self.document_location.object_name,
        )
    }

    /// File name of the analysed document without extension.
    pub fn document_name(&self) -> String {
        let key = &self.document_location.object_name;
        let file = key.rsplit('/').next().unwrap_or(key);
        match file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file.to_string(),
        }
    }
}
