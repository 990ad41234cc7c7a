use crate::SocialError;
use async_trait::async_trait;
use engagemint_storage::{EpochStore, StateKey};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Maximum number of ids the resolution endpoint accepts per call.
pub const RESOLVE_CHUNK_SIZE: usize = 100;

/// Read access to the on-chain user registry.
///
/// Ids come back in registration order; the position of an id in this list
/// is the user's directory index for the whole day.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn registered_ids(&self) -> Result<Vec<String>, SocialError>;
}

/// Resolves platform user ids into the handles post queries take.
#[async_trait]
pub trait HandleResolver: Send + Sync {
    /// Resolve at most [`RESOLVE_CHUNK_SIZE`] ids; handles come back in
    /// input order, one per id.
    async fn resolve(&self, ids: &[String]) -> Result<Vec<String>, SocialError>;
}

/// Resolves the registered-user directory into handles, caching partial
/// progress per day.
///
/// Resolution is the one directory operation that costs API calls, so the
/// already-resolved prefix is written back to storage after every chunk; a
/// failed invocation never re-pays for handles it already resolved.
pub struct DirectoryConnector {
    registry: Arc<dyn UserRegistry>,
    resolver: Arc<dyn HandleResolver>,
}

impl DirectoryConnector {
    pub fn new(registry: Arc<dyn UserRegistry>, resolver: Arc<dyn HandleResolver>) -> Self {
        Self { registry, resolver }
    }

    /// Full handle list for the day, index-aligned with the registry.
    pub async fn handles(&self, store: &EpochStore) -> Result<Vec<String>, SocialError> {
        let mut handles: Vec<String> = store
            .get(StateKey::HandleDirectory)
            .await?
            .unwrap_or_default();
        let ids = self.registry.registered_ids().await?;

        if handles.len() >= ids.len() {
            handles.truncate(ids.len());
            return Ok(handles);
        }

        debug!(
            resolved = handles.len(),
            registered = ids.len(),
            "resolving remaining directory handles"
        );

        while handles.len() < ids.len() {
            let upper = usize::min(handles.len() + RESOLVE_CHUNK_SIZE, ids.len());
            let chunk = &ids[handles.len()..upper];
            let resolved = self.resolver.resolve(chunk).await?;
            if resolved.len() != chunk.len() {
                return Err(SocialError::Directory(format!(
                    "resolver returned {} handles for {} ids",
                    resolved.len(),
                    chunk.len()
                )));
            }
            handles.extend(resolved);
            store.set(StateKey::HandleDirectory, &handles).await?;
        }

        info!(handles = handles.len(), "directory fully resolved");
        Ok(handles)
    }
}

/// Configuration for the HTTP directory client.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdsResponse {
    ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct HandlesResponse {
    handles: Vec<String>,
}

/// HTTP client implementing both directory traits against the resolution
/// service.
pub struct HttpDirectoryClient {
    config: DirectoryConfig,
    client: Client,
}

impl HttpDirectoryClient {
    pub fn new(config: DirectoryConfig) -> Result<Self, SocialError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            config: DirectoryConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl UserRegistry for HttpDirectoryClient {
    async fn registered_ids(&self) -> Result<Vec<String>, SocialError> {
        let response = self
            .client
            .get(self.endpoint("registered-users"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?;
        let body: IdsResponse = response.json().await?;
        Ok(body.ids)
    }
}

#[async_trait]
impl HandleResolver for HttpDirectoryClient {
    async fn resolve(&self, ids: &[String]) -> Result<Vec<String>, SocialError> {
        if ids.len() > RESOLVE_CHUNK_SIZE {
            return Err(SocialError::Directory(format!(
                "resolve called with {} ids (limit {RESOLVE_CHUNK_SIZE})",
                ids.len()
            )));
        }
        let response = self
            .client
            .post(self.endpoint("users/lookup"))
            .bearer_auth(&self.config.api_key)
            .json(&LookupRequest { ids })
            .send()
            .await?
            .error_for_status()?;
        let body: HandlesResponse = response.json().await?;
        Ok(body.handles)
    }
}
