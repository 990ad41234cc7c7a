//! Concurrent batch fetching against the social API.

use crate::batches::BatchPlan;
use crate::error::{WorkerError, WorkerResult};
use engagemint_social::{PostsPage, SocialApi, SocialError};
use engagemint_types::{Batch, MintingDay, Post};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one fetch round.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Posts from every successful batch, handles resolved to indices.
    pub posts: Vec<Post>,
    /// Batches whose request succeeded; cursors advanced, error counts reset.
    pub updated: Vec<Batch>,
    /// Batches whose request failed; error counts incremented. Retry policy
    /// is the orchestrator's call.
    pub failed: Vec<Batch>,
}

/// Fans one paginated request per batch out to the social API.
pub struct BatchFetcher {
    api: Arc<dyn SocialApi>,
    page_size: u32,
}

impl BatchFetcher {
    pub fn new(api: Arc<dyn SocialApi>, page_size: u32) -> Self {
        Self { api, page_size }
    }

    /// Fetch one page per batch concurrently.
    ///
    /// A batch failure never blocks its siblings. A handle the index map
    /// cannot resolve aborts the whole round instead: it signals that the
    /// cached directory snapshot and the API response have drifted apart.
    pub async fn fetch_in_batches(
        &self,
        day: MintingDay,
        plan: &BatchPlan,
    ) -> WorkerResult<FetchOutcome> {
        let requests = plan
            .batches
            .iter()
            .zip(plan.queries.iter())
            .map(|(batch, query)| async move {
                let page = self
                    .api
                    .posts_by_authors(day, query, &batch.next_cursor, self.page_size)
                    .await;
                (batch.clone(), page)
            });
        let results: Vec<(Batch, Result<PostsPage, SocialError>)> = join_all(requests).await;

        let mut outcome = FetchOutcome::default();
        for (mut batch, result) in results {
            match result {
                Ok(page) => {
                    debug!(
                        start = batch.start_index,
                        end = batch.end_index,
                        posts = page.posts.len(),
                        "batch page fetched"
                    );
                    for raw in page.posts {
                        let user_index = plan.index_map.index_for(&raw.author_handle).ok_or(
                            WorkerError::HandleResolution {
                                handle: raw.author_handle.clone(),
                            },
                        )?;
                        outcome.posts.push(Post {
                            user_index,
                            handle: raw.author_handle,
                            id: raw.id,
                            content: raw.content,
                            likes: raw.likes,
                            recasts: raw.recasts,
                            timestamp: raw.timestamp,
                        });
                    }
                    batch.next_cursor = page.next_cursor.unwrap_or_default();
                    batch.error_count = 0;
                    outcome.updated.push(batch);
                }
                Err(error) => {
                    warn!(
                        start = batch.start_index,
                        end = batch.end_index,
                        error = %error,
                        "batch fetch failed"
                    );
                    batch.error_count += 1;
                    outcome.failed.push(batch);
                }
            }
        }

        Ok(outcome)
    }
}
