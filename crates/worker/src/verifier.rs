//! Finish-time re-verification of high-engagement posts.
//!
//! Runs once per day, in the terminal round only. Re-verifying every round
//! would multiply API cost without tightening the guarantee: the holding set
//! already caps how much spoofed engagement can matter before the end.

use crate::error::WorkerResult;
use engagemint_social::{SocialApi, SocialError};
use engagemint_types::Post;
use std::sync::Arc;
use tracing::{debug, info};

/// Re-fetches held posts against the authoritative lookup endpoint.
pub struct EngagementVerifier {
    api: Arc<dyn SocialApi>,
}

impl EngagementVerifier {
    pub fn new(api: Arc<dyn SocialApi>) -> Self {
        Self { api }
    }

    /// Re-fetch each held post by id and overwrite its engagement fields
    /// with the authoritative values.
    ///
    /// A mismatch is corrected silently: the authoritative number always
    /// wins and is not an error condition. A post the authoritative API no
    /// longer knows is dropped entirely.
    pub async fn verify(&self, held: Vec<Post>) -> WorkerResult<Vec<Post>> {
        let mut verified = Vec::with_capacity(held.len());
        for mut post in held {
            let authoritative = match self.api.post_by_id(&post.id).await {
                Ok(authoritative) => authoritative,
                Err(SocialError::PostNotFound(id)) => {
                    info!(id = %id, "held post no longer exists, dropping");
                    continue;
                }
                Err(error) => return Err(error.into()),
            };

            if authoritative.likes != post.likes {
                debug!(
                    id = %post.id,
                    claimed = post.likes,
                    authoritative = authoritative.likes,
                    "corrected engagement count"
                );
            }
            post.likes = authoritative.likes;
            post.content = authoritative.content;
            post.recasts = authoritative.recasts;
            verified.push(post);
        }
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use engagemint_social::{PostsPage, RawPost};
    use engagemint_types::MintingDay;
    use std::collections::HashMap;

    struct LookupApi {
        by_id: HashMap<String, RawPost>,
        error_ids: Vec<String>,
    }

    #[async_trait::async_trait]
    impl SocialApi for LookupApi {
        async fn posts_by_authors(
            &self,
            _day: MintingDay,
            _authors: &str,
            _cursor: &str,
            _limit: u32,
        ) -> Result<PostsPage, SocialError> {
            Ok(PostsPage::default())
        }

        async fn post_by_id(&self, id: &str) -> Result<RawPost, SocialError> {
            if self.error_ids.iter().any(|e| e == id) {
                return Err(SocialError::Decode("scripted failure".to_string()));
            }
            self.by_id
                .get(id)
                .cloned()
                .ok_or_else(|| SocialError::PostNotFound(id.to_string()))
        }
    }

    fn held(id: &str, likes: u64) -> Post {
        Post {
            user_index: 1,
            handle: "alice".to_string(),
            id: id.to_string(),
            content: "gm".to_string(),
            likes,
            recasts: None,
            timestamp: 1_700_000_100,
        }
    }

    fn authoritative(id: &str, likes: u64, content: &str) -> RawPost {
        RawPost {
            id: id.to_string(),
            author_handle: "alice".to_string(),
            content: content.to_string(),
            likes,
            recasts: Some(2),
            timestamp: 1_700_000_100,
        }
    }

    #[tokio::test]
    async fn test_authoritative_count_wins() {
        let verifier = EngagementVerifier::new(Arc::new(LookupApi {
            by_id: HashMap::from([("1".to_string(), authoritative("1", 90, "gm verified"))]),
            error_ids: Vec::new(),
        }));

        let verified = verifier.verify(vec![held("1", 150)]).await.unwrap();

        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].likes, 90);
        assert_eq!(verified[0].content, "gm verified");
        assert_eq!(verified[0].recasts, Some(2));
    }

    #[tokio::test]
    async fn test_missing_post_dropped() {
        let verifier = EngagementVerifier::new(Arc::new(LookupApi {
            by_id: HashMap::from([("1".to_string(), authoritative("1", 200, "gm"))]),
            error_ids: Vec::new(),
        }));

        let verified = verifier
            .verify(vec![held("1", 150), held("gone", 400)])
            .await
            .unwrap();

        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, "1");
    }

    #[tokio::test]
    async fn test_transient_failure_propagates() {
        let verifier = EngagementVerifier::new(Arc::new(LookupApi {
            by_id: HashMap::new(),
            error_ids: vec!["1".to_string()],
        }));

        let result = verifier.verify(vec![held("1", 150)]).await;
        assert!(matches!(result, Err(WorkerError::Social(_))));
    }
}
