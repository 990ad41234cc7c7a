use crate::SocialError;
use async_trait::async_trait;
use engagemint_types::MintingDay;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the social API client.
#[derive(Debug, Clone)]
pub struct SocialApiConfig {
    /// API base URL.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for SocialApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// One page of the author-set search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostsPage {
    pub posts: Vec<RawPost>,
    /// Absent when the result set is exhausted.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A post as returned by the API, before handle resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub author_handle: String,
    pub content: String,
    pub likes: u64,
    #[serde(default)]
    pub recasts: Option<u64>,
    pub timestamp: u64,
}

/// Read access to the social platform.
///
/// `posts_by_authors` is the cheap bulk endpoint whose engagement numbers
/// are not trusted above the verification threshold; `post_by_id` is the
/// authoritative lookup that settles them.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Fetch one page of posts authored by the comma-joined handle set,
    /// restricted to the given day. An empty cursor starts from the top.
    async fn posts_by_authors(
        &self,
        day: MintingDay,
        authors: &str,
        cursor: &str,
        limit: u32,
    ) -> Result<PostsPage, SocialError>;

    /// Fetch a single post by its immutable id.
    async fn post_by_id(&self, id: &str) -> Result<RawPost, SocialError>;
}

/// HTTP implementation of [`SocialApi`].
pub struct HttpSocialApi {
    config: SocialApiConfig,
    client: Client,
}

impl HttpSocialApi {
    pub fn new(config: SocialApiConfig) -> Result<Self, SocialError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            config: SocialApiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    pub fn config(&self) -> &SocialApiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl SocialApi for HttpSocialApi {
    async fn posts_by_authors(
        &self,
        day: MintingDay,
        authors: &str,
        cursor: &str,
        limit: u32,
    ) -> Result<PostsPage, SocialError> {
        let (start, end) = day.window();
        let mut request = self
            .client
            .get(self.endpoint("posts/search"))
            .bearer_auth(&self.config.api_key)
            .query(&[("authors", authors)])
            .query(&[("max_results", limit)])
            .query(&[("start_time", start), ("end_time", end)]);
        if !cursor.is_empty() {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request.send().await?.error_for_status()?;
        let page: PostsPage = response.json().await?;

        debug!(
            day = %day,
            posts = page.posts.len(),
            has_next = page.next_cursor.is_some(),
            "fetched posts page"
        );
        Ok(page)
    }

    async fn post_by_id(&self, id: &str) -> Result<RawPost, SocialError> {
        let response = self
            .client
            .get(self.endpoint(&format!("posts/{id}")))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SocialError::PostNotFound(id.to_string()));
        }

        let post: RawPost = response.error_for_status()?.json().await?;
        Ok(post)
    }
}
