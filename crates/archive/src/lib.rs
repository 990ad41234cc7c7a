//! Post archival: running-hash accumulator and upload client
//!
//! Every counted post is appended to an in-memory buffer and folded into a
//! chained SHA-256 digest. The digest is the tamper-evidence anchor between
//! the off-chain computation and the final on-chain call: an auditor reading
//! the archived records in upload order must reproduce it exactly, so call
//! order is significant and the accumulator state only advances past records
//! that were actually archived.

use async_trait::async_trait;
use engagemint_types::{MintingDay, Post, ProcessingType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("corrupt accumulator state: {0}")]
    CorruptState(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One archived post record as shipped to the archival server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedRecord {
    pub post_id: String,
    pub user_index: u32,
    pub handle: String,
    pub content: String,
    pub likes: u64,
    pub processing: ProcessingType,
}

/// Canonical key a record contributes to the running hash.
pub fn canonical_key(id: &str, likes: u64, content: &str) -> String {
    format!("{id}|{likes}|{content}")
}

/// Persisted accumulator state, saved after every successful upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveState {
    /// Lowercase hex digest; empty until the first record.
    pub running_hash: String,
    /// Records archived so far this day.
    pub records_uploaded: u64,
}

/// Chained-digest accumulator over counted posts, in upload order.
#[derive(Debug, Clone, Default)]
pub struct RecordAccumulator {
    running_hash: Vec<u8>,
    buffer: Vec<ArchivedRecord>,
    records_uploaded: u64,
}

impl RecordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the state persisted by a previous invocation.
    pub fn restore(state: &ArchiveState) -> Result<Self, ArchiveError> {
        let running_hash = if state.running_hash.is_empty() {
            Vec::new()
        } else {
            hex::decode(&state.running_hash)
                .map_err(|error| ArchiveError::CorruptState(error.to_string()))?
        };
        Ok(Self {
            running_hash,
            buffer: Vec::new(),
            records_uploaded: state.records_uploaded,
        })
    }

    /// Append a counted post.
    ///
    /// The digest chains over the exact call sequence: reordering two posts
    /// changes the result. Callers must add in the same order they archive.
    pub fn add(&mut self, post: &Post, processing: ProcessingType) {
        let key = canonical_key(&post.id, post.likes, &post.content);
        let mut hasher = Sha256::new();
        hasher.update(&self.running_hash);
        hasher.update(key.as_bytes());
        self.running_hash = hasher.finalize().to_vec();

        self.buffer.push(ArchivedRecord {
            post_id: post.id.clone(),
            user_index: post.user_index,
            handle: post.handle.clone(),
            content: post.content.clone(),
            likes: post.likes,
            processing,
        });
    }

    /// Records accumulated since the last successful upload.
    pub fn buffered(&self) -> &[ArchivedRecord] {
        &self.buffer
    }

    /// Mark the current buffer as archived.
    pub fn mark_uploaded(&mut self) {
        self.records_uploaded += self.buffer.len() as u64;
        self.buffer.clear();
    }

    pub fn records_uploaded(&self) -> u64 {
        self.records_uploaded
    }

    pub fn running_hash_hex(&self) -> String {
        hex::encode(&self.running_hash)
    }

    pub fn state(&self) -> ArchiveState {
        ArchiveState {
            running_hash: self.running_hash_hex(),
            records_uploaded: self.records_uploaded,
        }
    }
}

/// Write access to the archival server.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist a record batch. Returns `false` on any failure (HTTP error,
    /// network error, rejecting body) instead of erroring; the caller
    /// decides whether that aborts the invocation.
    async fn save_records(&self, day: MintingDay, records: &[ArchivedRecord]) -> bool;

    /// Kick off the content-addressed archive upload for a finished day.
    /// Fire-and-forget: the call is never awaited.
    fn trigger_content_archive(&self, day: MintingDay);
}

/// Configuration for the archival server client.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8082".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRecordsRequest<'a> {
    records: &'a [ArchivedRecord],
    minting_day_timestamp: u32,
}

#[derive(Debug, Deserialize)]
struct SaveRecordsResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentArchiveRequest {
    minting_day_timestamp: u32,
}

/// HTTP implementation of [`RecordSink`].
#[derive(Debug, Clone)]
pub struct HttpArchive {
    config: ArchiveConfig,
    client: reqwest::Client,
}

impl HttpArchive {
    pub fn new(config: ArchiveConfig) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config: ArchiveConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }
}

#[async_trait]
impl RecordSink for HttpArchive {
    async fn save_records(&self, day: MintingDay, records: &[ArchivedRecord]) -> bool {
        let request = SaveRecordsRequest {
            records,
            minting_day_timestamp: day.timestamp(),
        };

        let response = match self
            .client
            .post(self.endpoint("SaveRecords"))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(day = %day, error = %error, "archival upload request failed");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(day = %day, status = %response.status(), "archival server returned error status");
            return false;
        }

        match response.json::<SaveRecordsResponse>().await {
            Ok(body) if body.success => {
                debug!(day = %day, records = records.len(), "records archived");
                true
            }
            Ok(_) => {
                warn!(day = %day, "archival server rejected records");
                false
            }
            Err(error) => {
                warn!(day = %day, error = %error, "malformed archival response");
                false
            }
        }
    }

    fn trigger_content_archive(&self, day: MintingDay) {
        let client = self.client.clone();
        let url = self.endpoint("UploadToIPFS");
        tokio::spawn(async move {
            let request = ContentArchiveRequest {
                minting_day_timestamp: day.timestamp(),
            };
            match client.post(url).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(day = %day, "content archive upload triggered");
                }
                Ok(response) => {
                    warn!(day = %day, status = %response.status(), "content archive trigger rejected");
                }
                Err(error) => {
                    warn!(day = %day, error = %error, "content archive trigger failed");
                }
            }
        });
    }
}
