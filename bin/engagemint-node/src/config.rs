use anyhow::{bail, Context, Result};
use engagemint_archive::ArchiveConfig;
use engagemint_social::{DirectoryConfig, SocialApiConfig};
use engagemint_types::Platform;
use engagemint_worker::WorkerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Node configuration loaded from a TOML file.
///
/// API keys and server URLs are configuration, never constants; the worker
/// refuses to start on an incomplete file rather than failing mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Platform whose posts this node scores.
    pub platform: Platform,

    /// Keyword the scoring engine matches.
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// Root directory for the key-value store.
    pub storage_root: PathBuf,

    pub social: SocialSection,
    pub directory: DirectorySection,
    pub archive: ArchiveSection,

    #[serde(default)]
    pub worker: WorkerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSection {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySection {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSection {
    pub base_url: String,
    #[serde(default = "default_archive_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub concurrency_limit: usize,
    pub max_handles_per_batch: usize,
    pub max_query_len: usize,
    pub page_size: u32,
    pub retry_limit: u32,
    pub likes_threshold: u64,
    pub max_pending: usize,
    pub hashtag_cap: u32,
    pub cashtag_cap: u32,
}

impl Default for WorkerSection {
    fn default() -> Self {
        let defaults = WorkerConfig::default();
        Self {
            concurrency_limit: defaults.concurrency_limit,
            max_handles_per_batch: defaults.max_handles_per_batch,
            max_query_len: defaults.max_query_len,
            page_size: defaults.page_size,
            retry_limit: defaults.retry_limit,
            likes_threshold: defaults.likes_threshold,
            max_pending: defaults.max_pending,
            hashtag_cap: defaults.hashtag_cap,
            cashtag_cap: defaults.cashtag_cap,
        }
    }
}

fn default_keyword() -> String {
    "gm".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_archive_timeout_ms() -> u64 {
    30_000
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Fail fast on values no invocation could run with.
    pub fn validate(&self) -> Result<()> {
        if self.social.base_url.is_empty() {
            bail!("social.base_url cannot be empty");
        }
        if self.social.api_key.is_empty() {
            bail!("social.api_key cannot be empty");
        }
        if self.directory.base_url.is_empty() {
            bail!("directory.base_url cannot be empty");
        }
        if self.archive.base_url.is_empty() {
            bail!("archive.base_url cannot be empty");
        }
        if self.storage_root.as_os_str().is_empty() {
            bail!("storage_root cannot be empty");
        }
        Ok(())
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            platform: self.platform,
            keyword: self.keyword.clone(),
            concurrency_limit: self.worker.concurrency_limit,
            max_handles_per_batch: self.worker.max_handles_per_batch,
            max_query_len: self.worker.max_query_len,
            page_size: self.worker.page_size,
            retry_limit: self.worker.retry_limit,
            likes_threshold: self.worker.likes_threshold,
            max_pending: self.worker.max_pending,
            hashtag_cap: self.worker.hashtag_cap,
            cashtag_cap: self.worker.cashtag_cap,
        }
    }

    pub fn social_config(&self) -> SocialApiConfig {
        SocialApiConfig {
            base_url: self.social.base_url.clone(),
            api_key: self.social.api_key.clone(),
            request_timeout: Duration::from_millis(self.social.timeout_ms),
        }
    }

    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            base_url: self.directory.base_url.clone(),
            api_key: self.directory.api_key.clone(),
            request_timeout: Duration::from_millis(self.directory.timeout_ms),
        }
    }

    pub fn archive_config(&self) -> ArchiveConfig {
        ArchiveConfig {
            base_url: self.archive.base_url.clone(),
            request_timeout: Duration::from_millis(self.archive.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
platform = "twitter"
storage_root = "/var/lib/engagemint"

[social]
base_url = "https://api.social.example"
api_key = "secret-social"

[directory]
base_url = "https://directory.example"
api_key = "secret-directory"

[archive]
base_url = "https://archive.example"
"#;

    #[test]
    fn test_load_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, VALID).unwrap();

        let config = NodeConfig::load(&path).expect("load");
        config.validate().expect("validate");

        assert_eq!(config.platform, Platform::Twitter);
        assert_eq!(config.keyword, "gm");
        assert_eq!(config.worker.concurrency_limit, 10);
        assert_eq!(config.worker.retry_limit, 3);
        assert_eq!(config.social.timeout_ms, 10_000);
    }

    #[test]
    fn test_custom_worker_section() {
        let toml = format!(
            "{VALID}\n[worker]\nconcurrency_limit = 3\nlikes_threshold = 250\n"
        );
        let config: NodeConfig = toml::from_str(&toml).unwrap();

        assert_eq!(config.worker.concurrency_limit, 3);
        assert_eq!(config.worker.likes_threshold, 250);
        // Unset fields keep their defaults.
        assert_eq!(config.worker.max_pending, 300);
    }

    #[test]
    fn test_validation_catches_missing_key() {
        let toml = VALID.replace("secret-social", "");
        let config: NodeConfig = toml::from_str(&toml).unwrap();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("social.api_key"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "platform = twitter oops").unwrap();
        assert!(NodeConfig::load(&path).is_err());
    }

    #[test]
    fn test_worker_config_projection() {
        let config: NodeConfig = toml::from_str(VALID).unwrap();
        let worker = config.worker_config();
        assert_eq!(worker.platform, Platform::Twitter);
        assert_eq!(worker.keyword, "gm");
        assert!(worker.validate().is_ok());
    }
}
