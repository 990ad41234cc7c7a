//! Batch reconciliation and expansion.
//!
//! Rebuilds the active pagination batches from the incoming cursor array and
//! carves new index ranges out of the user directory while the concurrency
//! budget allows. Reconstruction reads handle lists back from storage rather
//! than re-deriving them, so a batch rebuilt after a crash issues a
//! byte-identical author query.

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use engagemint_social::DirectoryConnector;
use engagemint_storage::{EpochStore, StateKey};
use engagemint_types::{Batch, UserIndexMap};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The reconciled work set for one invocation.
#[derive(Debug, Default)]
pub struct BatchPlan {
    pub batches: Vec<Batch>,
    /// Author query per batch, aligned with `batches`.
    pub queries: Vec<String>,
    /// Index ↔ handle association covering every planned batch.
    pub index_map: UserIndexMap,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Reconstructs and grows the set of concurrent pagination batches.
pub struct BatchManager {
    concurrency_limit: usize,
    max_handles_per_batch: usize,
    max_query_len: usize,
}

impl BatchManager {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            max_handles_per_batch: config.max_handles_per_batch,
            max_query_len: config.max_query_len,
        }
    }

    /// The author query for a handle list. Deterministic: the same cached
    /// list always produces the same query bytes.
    pub fn author_query(handles: &[String]) -> String {
        handles.join(",")
    }

    /// Reconcile incoming batches with stored cursor state and expand up to
    /// the concurrency limit.
    ///
    /// Drained ranges are dropped and their cached handle lists released.
    /// Ranges claimed by an aborted invocation are resumed from their handle
    /// caches. New ranges are always contiguous with the persisted
    /// high-water mark, so a resumed invocation never reassigns an index.
    pub async fn generate(
        &self,
        store: &EpochStore,
        directory: &DirectoryConnector,
        incoming: Vec<Batch>,
    ) -> WorkerResult<BatchPlan> {
        let mut plan = BatchPlan::default();

        // Stored cursors win over the event's: state is checkpointed before
        // the transaction is emitted, so a stored cursor is never behind
        // what the chain acknowledged, and re-fetching an acknowledged page
        // would double-count its posts.
        let stored: Vec<Batch> = store.get(StateKey::ActiveBatches).await?.unwrap_or_default();
        let mut merged: BTreeMap<(u32, u32), Batch> = BTreeMap::new();
        for batch in incoming {
            merged.insert((batch.start_index, batch.end_index), batch);
        }
        for batch in stored {
            merged.insert((batch.start_index, batch.end_index), batch);
        }

        let mut active = Vec::new();
        for batch in merged.into_values() {
            if batch.is_drained() {
                store
                    .delete(StateKey::BatchHandles {
                        start_index: batch.start_index,
                        end_index: batch.end_index,
                    })
                    .await?;
                debug!(
                    start = batch.start_index,
                    end = batch.end_index,
                    "dropped drained batch"
                );
            } else {
                active.push(batch);
            }
        }

        // A handle cache with no surviving batch belongs to a range claimed
        // by an invocation that aborted before its first checkpoint; resume
        // it from the top.
        let claimed: Vec<(u32, u32)> = active
            .iter()
            .map(|batch| (batch.start_index, batch.end_index))
            .collect();
        for (start_index, end_index) in store.batch_handle_ranges().await? {
            if !claimed.contains(&(start_index, end_index)) {
                debug!(
                    start = start_index,
                    end = end_index,
                    "recovered unstarted batch"
                );
                active.push(Batch::new(start_index, end_index));
            }
        }
        active.sort_by_key(|batch| batch.start_index);

        for batch in active {
            let handles: Vec<String> = store
                .get(StateKey::BatchHandles {
                    start_index: batch.start_index,
                    end_index: batch.end_index,
                })
                .await?
                .ok_or(WorkerError::MissingHandleCache {
                    start_index: batch.start_index,
                    end_index: batch.end_index,
                })?;

            plan.index_map.extend_range(batch.start_index, &handles);
            plan.queries.push(Self::author_query(&handles));
            plan.batches.push(batch);
        }

        if plan.batches.len() >= self.concurrency_limit {
            return Ok(plan);
        }

        let mut max_end: u32 = store.get(StateKey::MaxEndIndex).await?.unwrap_or(0);
        let handles = directory.handles(store).await?;

        while plan.batches.len() < self.concurrency_limit && (max_end as usize) < handles.len() {
            let slice = self.claim_slice(&handles, max_end as usize);
            let batch = Batch::new(max_end, max_end + slice.len() as u32);

            // Cache before the first query so a crashed invocation can
            // rebuild the exact same batch.
            store
                .set(
                    StateKey::BatchHandles {
                        start_index: batch.start_index,
                        end_index: batch.end_index,
                    },
                    slice,
                )
                .await?;
            max_end = batch.end_index;
            store.set(StateKey::MaxEndIndex, &max_end).await?;

            info!(
                start = batch.start_index,
                end = batch.end_index,
                "created batch"
            );
            plan.index_map.extend_range(batch.start_index, slice);
            plan.queries.push(Self::author_query(slice));
            plan.batches.push(batch);
        }

        Ok(plan)
    }

    /// Take the next handle slice, bounded by handle count and by joined
    /// query length. Always takes at least one handle so an oversized handle
    /// cannot stall the directory.
    fn claim_slice<'a>(&self, handles: &'a [String], from: usize) -> &'a [String] {
        let mut taken = 0;
        let mut query_len = 0;
        while taken < self.max_handles_per_batch && from + taken < handles.len() {
            let addition = handles[from + taken].len() + usize::from(taken > 0);
            if taken > 0 && query_len + addition > self.max_query_len {
                break;
            }
            query_len += addition;
            taken += 1;
        }
        &handles[from..from + taken]
    }
}
