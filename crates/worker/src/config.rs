//! Worker configuration.

use crate::error::{WorkerError, WorkerResult};
use engagemint_scoring::{DEFAULT_LIKES_THRESHOLD, DEFAULT_MAX_PENDING};
use engagemint_types::Platform;

/// Tuning and policy values for the minting worker.
///
/// Everything that used to be a contract-side constant (keyword, caps,
/// thresholds) is injected here so deployments differ by configuration only.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Platform whose posts are scored; also selects contract function names.
    pub platform: Platform,
    /// Keyword the scoring engine matches.
    pub keyword: String,
    /// Maximum number of batches paginated concurrently.
    pub concurrency_limit: usize,
    /// Maximum handles absorbed by one batch.
    pub max_handles_per_batch: usize,
    /// Maximum length of one batch's author query.
    pub max_query_len: usize,
    /// Page size requested from the social API.
    pub page_size: u32,
    /// Consecutive fetch failures before a batch is logged as a hard error.
    pub retry_limit: u32,
    /// Likes above which a post is held for authoritative re-verification.
    pub likes_threshold: u64,
    /// Bound on the number of held posts.
    pub max_pending: usize,
    /// Daily per-user cap on hashtag-form posts.
    pub hashtag_cap: u32,
    /// Daily per-user cap on cashtag-form posts.
    pub cashtag_cap: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Twitter,
            keyword: "gm".to_string(),
            concurrency_limit: 10,
            max_handles_per_batch: 20,
            max_query_len: 512,
            page_size: 100,
            retry_limit: 3,
            likes_threshold: DEFAULT_LIKES_THRESHOLD,
            max_pending: DEFAULT_MAX_PENDING,
            hashtag_cap: 10,
            cashtag_cap: 10,
        }
    }
}

impl WorkerConfig {
    /// Fail fast on values that would make the worker misbehave silently.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.keyword.trim().is_empty() {
            return Err(WorkerError::Config("keyword cannot be empty".to_string()));
        }
        if self.concurrency_limit == 0 {
            return Err(WorkerError::Config(
                "concurrency_limit cannot be 0".to_string(),
            ));
        }
        if self.max_handles_per_batch == 0 {
            return Err(WorkerError::Config(
                "max_handles_per_batch cannot be 0".to_string(),
            ));
        }
        if self.max_query_len == 0 {
            return Err(WorkerError::Config(
                "max_query_len cannot be 0".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(WorkerError::Config("page_size cannot be 0".to_string()));
        }
        if self.retry_limit == 0 {
            return Err(WorkerError::Config("retry_limit cannot be 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(WorkerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_keyword() {
        let config = WorkerConfig {
            keyword: "  ".to_string(),
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_limits() {
        for config in [
            WorkerConfig {
                concurrency_limit: 0,
                ..WorkerConfig::default()
            },
            WorkerConfig {
                max_handles_per_batch: 0,
                ..WorkerConfig::default()
            },
            WorkerConfig {
                page_size: 0,
                ..WorkerConfig::default()
            },
            WorkerConfig {
                retry_limit: 0,
                ..WorkerConfig::default()
            },
        ] {
            assert!(config.validate().is_err());
        }
    }
}
