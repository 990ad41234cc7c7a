//! Core types for the engagemint off-chain minting worker
//!
//! This crate provides the shared data model used across all worker
//! components: minting-day epochs, pagination batches, social posts, and
//! per-user engagement tallies.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Length of one minting day in seconds.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// One day's scoring window, identified by its UTC midnight timestamp.
///
/// Every piece of worker state is scoped to a minting day and garbage
/// collected together when the day finishes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MintingDay(u32);

impl MintingDay {
    /// Create a minting day from any timestamp inside it (floors to UTC midnight).
    pub fn new(timestamp: u32) -> Self {
        Self((timestamp / SECONDS_PER_DAY) * SECONDS_PER_DAY)
    }

    /// The UTC midnight timestamp identifying this day.
    pub fn timestamp(&self) -> u32 {
        self.0
    }

    /// Half-open `[start, end)` window of the day in Unix seconds.
    pub fn window(&self) -> (u32, u32) {
        (self.0, self.0 + SECONDS_PER_DAY)
    }

    /// Whether a post timestamp falls inside this day.
    pub fn contains(&self, timestamp: u64) -> bool {
        let (start, end) = self.window();
        timestamp >= u64::from(start) && timestamp < u64::from(end)
    }
}

impl std::fmt::Display for MintingDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match DateTime::from_timestamp(i64::from(self.0), 0) {
            Some(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d")),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Social platform the worker scores posts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Farcaster,
}

impl Platform {
    /// Capitalized platform name used inside contract function names.
    pub fn call_infix(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter",
            Platform::Farcaster => "Farcaster",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Twitter => write!(f, "twitter"),
            Platform::Farcaster => write!(f, "farcaster"),
        }
    }
}

/// A contiguous slice of the user directory paired with a pagination cursor.
///
/// Covers directory indices `[start_index, end_index)`. An empty cursor on a
/// batch that has been fetched at least once means the range is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub start_index: u32,
    pub end_index: u32,
    pub next_cursor: String,
    pub error_count: u32,
}

impl Batch {
    /// A fresh batch that has not been fetched yet.
    pub fn new(start_index: u32, end_index: u32) -> Self {
        Self {
            start_index,
            end_index,
            next_cursor: String::new(),
            error_count: 0,
        }
    }

    /// Whether this range has been fully paginated through.
    pub fn is_drained(&self) -> bool {
        self.next_cursor.is_empty() && self.error_count == 0
    }

    /// Number of directory indices the batch covers.
    pub fn len(&self) -> u32 {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Directory indices covered by this batch.
    pub fn indices(&self) -> std::ops::Range<u32> {
        self.start_index..self.end_index
    }
}

/// A post fetched from the social API.
///
/// Ephemeral: consumed by the scoring engine or parked in the
/// pending-verification set, never stored beyond that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub user_index: u32,
    pub handle: String,
    pub id: String,
    pub content: String,
    pub likes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recasts: Option<u64>,
    pub timestamp: u64,
}

/// How the scoring engine counted a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingType {
    Skipped,
    Simple,
    Hashtag,
    Cashtag,
}

impl ProcessingType {
    /// Whether the post contributed to a tally.
    pub fn counts(&self) -> bool {
        !matches!(self, ProcessingType::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingType::Skipped => "skipped",
            ProcessingType::Simple => "simple",
            ProcessingType::Hashtag => "hashtag",
            ProcessingType::Cashtag => "cashtag",
        }
    }
}

/// Per-user accumulated engagement counts for one minting day.
///
/// Accumulates monotonically across invocations until the user's batch
/// drains, at which point the tally is flushed on-chain and deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTally {
    pub user_index: u32,
    pub posts: u32,
    pub simple_posts: u32,
    pub hashtag_posts: u32,
    pub cashtag_posts: u32,
    pub likes: u64,
}

impl UserTally {
    pub fn new(user_index: u32) -> Self {
        Self {
            user_index,
            ..Self::default()
        }
    }

    /// Whether any post has been counted for this user.
    pub fn is_empty(&self) -> bool {
        self.posts == 0
    }
}

/// Bidirectional association between directory indices and social handles.
///
/// Built once per invocation from the cached per-batch handle lists; handle
/// lookups are case-insensitive since platforms treat handles that way.
#[derive(Debug, Clone, Default)]
pub struct UserIndexMap {
    by_handle: HashMap<String, u32>,
    by_index: BTreeMap<u32, String>,
}

impl UserIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32, handle: &str) {
        self.by_handle.insert(handle.to_ascii_lowercase(), index);
        self.by_index.insert(index, handle.to_string());
    }

    /// Associate a contiguous run of handles starting at `start_index`.
    pub fn extend_range(&mut self, start_index: u32, handles: &[String]) {
        for (offset, handle) in handles.iter().enumerate() {
            self.insert(start_index + offset as u32, handle);
        }
    }

    pub fn index_for(&self, handle: &str) -> Option<u32> {
        self.by_handle.get(&handle.to_ascii_lowercase()).copied()
    }

    pub fn handle_for(&self, index: u32) -> Option<&str> {
        self.by_index.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}
