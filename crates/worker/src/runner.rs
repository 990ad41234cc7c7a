//! Invocation orchestrator and minting state machine.
//!
//! One call to [`MintingWorker::handle_event`] is one stateless invocation:
//! decode the trigger, restore per-day state, advance pagination, emit the
//! next chain calls. State is written back only after the round's network
//! effects have fully succeeded, so a failed invocation is always safe to
//! retry from the last checkpoint, and the running hash never advances past
//! what was actually archived.

use std::collections::HashMap;
use std::sync::Arc;

use engagemint_archive::{ArchiveState, RecordAccumulator, RecordSink};
use engagemint_chain::{CallData, ChainCall, MintingEvent};
use engagemint_scoring::{PendingSet, ScoringEngine};
use engagemint_social::{DirectoryConnector, SocialApi};
use engagemint_storage::{EpochStore, KeyValueStore, StateKey};
use engagemint_types::{MintingDay, Post, UserTally};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::batches::{BatchManager, BatchPlan};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::fetcher::BatchFetcher;
use crate::metrics::WorkerMetrics;
use crate::verifier::EngagementVerifier;

/// What one invocation asks the embedder to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum InvocationOutcome {
    /// Submit these calls, in order.
    Execute { calls: Vec<CallData> },
    /// Submit nothing. The scheduler re-triggers later and the worker
    /// resumes from unchanged state.
    NotExecutable { reason: String },
}

/// Per-day state restored at the start of every invocation.
struct EpochState {
    tallies: HashMap<u32, UserTally>,
    pending: PendingSet,
    accumulator: RecordAccumulator,
}

impl EpochState {
    async fn load(store: &EpochStore, config: &WorkerConfig) -> WorkerResult<Self> {
        let tallies = store.get(StateKey::Tallies).await?.unwrap_or_default();
        let held: Vec<Post> = store
            .get(StateKey::PendingVerification)
            .await?
            .unwrap_or_default();
        let pending = PendingSet::restore(config.likes_threshold, config.max_pending, held);
        let archive: ArchiveState = store.get(StateKey::ArchiveState).await?.unwrap_or_default();
        let accumulator = RecordAccumulator::restore(&archive)?;
        Ok(Self {
            tallies,
            pending,
            accumulator,
        })
    }

    async fn persist(&self, store: &EpochStore) -> WorkerResult<()> {
        store.set(StateKey::Tallies, &self.tallies).await?;
        store
            .set(StateKey::PendingVerification, self.pending.entries())
            .await?;
        store
            .set(StateKey::ArchiveState, &self.accumulator.state())
            .await?;
        Ok(())
    }
}

/// The orchestrator wiring every component of one minting worker together.
pub struct MintingWorker {
    config: WorkerConfig,
    store: Arc<dyn KeyValueStore>,
    directory: DirectoryConnector,
    batch_manager: BatchManager,
    fetcher: BatchFetcher,
    engine: ScoringEngine,
    verifier: EngagementVerifier,
    sink: Arc<dyn RecordSink>,
    metrics: Option<Arc<WorkerMetrics>>,
}

impl MintingWorker {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn SocialApi>,
        directory: DirectoryConnector,
        sink: Arc<dyn RecordSink>,
    ) -> WorkerResult<Self> {
        config.validate()?;
        let batch_manager = BatchManager::new(&config);
        let fetcher = BatchFetcher::new(api.clone(), config.page_size);
        let engine = ScoringEngine::new(&config.keyword, config.hashtag_cap, config.cashtag_cap);
        let verifier = EngagementVerifier::new(api);
        Ok(Self {
            config,
            store,
            directory,
            batch_manager,
            fetcher,
            engine,
            verifier,
            sink,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<WorkerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Decode and run one invocation.
    ///
    /// Every failure becomes a non-executable outcome with a diagnostic
    /// instead of a submitted no-op transaction; the on-chain side simply
    /// re-triggers on its next tick.
    pub async fn handle_event(&self, payload: &[u8]) -> InvocationOutcome {
        let event = match MintingEvent::decode(payload) {
            Ok(event) => event,
            Err(decode_error) => {
                error!(error = %decode_error, "trigger event decode failed");
                return InvocationOutcome::NotExecutable {
                    reason: decode_error.to_string(),
                };
            }
        };

        match self.run(event).await {
            Ok(outcome) => outcome,
            Err(run_error) => {
                error!(error = %run_error, "invocation failed");
                InvocationOutcome::NotExecutable {
                    reason: run_error.to_string(),
                }
            }
        }
    }

    /// Run one decoded invocation.
    pub async fn run(&self, event: MintingEvent) -> WorkerResult<InvocationOutcome> {
        let day = event.minting_day_timestamp;
        let store = EpochStore::new(self.store.clone(), day);

        info!(
            day = %day,
            incoming_batches = event.batches.len(),
            "invocation started"
        );

        let state = EpochState::load(&store, &self.config).await?;
        let plan = self
            .batch_manager
            .generate(&store, &self.directory, event.batches)
            .await?;

        if plan.is_empty() {
            self.finish_round(day, &store, state).await
        } else {
            self.continue_round(day, &store, state, plan).await
        }
    }

    /// A round with outstanding batches: fetch, score, archive, persist,
    /// then hand the advanced cursor array back on-chain.
    async fn continue_round(
        &self,
        day: MintingDay,
        store: &EpochStore,
        mut state: EpochState,
        plan: BatchPlan,
    ) -> WorkerResult<InvocationOutcome> {
        let fetched = self.fetcher.fetch_in_batches(day, &plan).await?;
        if let Some(metrics) = &self.metrics {
            metrics.fetch_rounds_total.inc();
            metrics
                .batch_failures_total
                .inc_by(fetched.failed.len() as u64);
        }

        for post in fetched.posts {
            self.ingest(&mut state, post);
        }

        // Split failures into ranges still worth retrying and ranges that
        // exhausted their budget. The latter are reported exactly once and
        // never resubmitted; their users go unscored, which is the accepted
        // trade-off for a permanently failing range.
        let mut retryable = Vec::new();
        let mut errored = Vec::new();
        for batch in fetched.failed {
            if batch.error_count >= self.config.retry_limit {
                warn!(
                    start = batch.start_index,
                    end = batch.end_index,
                    errors = batch.error_count,
                    "batch exceeded retry budget"
                );
                errored.push(batch);
            } else {
                retryable.push(batch);
            }
        }

        // Flush tallies whose range drained this round, unless the user
        // still has a post held for verification.
        let mut results = Vec::new();
        let mut drained = Vec::new();
        let mut next_batches = Vec::new();
        for batch in fetched.updated {
            if batch.is_drained() {
                for index in batch.indices() {
                    if state.pending.holds_user(index) {
                        continue;
                    }
                    if let Some(tally) = state.tallies.remove(&index) {
                        results.push(tally);
                    }
                }
                drained.push(batch);
            } else {
                next_batches.push(batch);
            }
        }
        next_batches.extend(retryable);
        results.sort_by_key(|tally| tally.user_index);

        // Archive before anything is persisted: an upload failure aborts the
        // invocation so the next one replays from the previous checkpoint.
        self.upload_buffered(day, &mut state).await?;

        state.persist(store).await?;
        store.set(StateKey::ActiveBatches, &next_batches).await?;

        // Finished and abandoned ranges release their handle caches; the
        // caches are also the claim record, so an abandoned range must not
        // look resumable.
        for batch in drained.iter().chain(errored.iter()) {
            store
                .delete(StateKey::BatchHandles {
                    start_index: batch.start_index,
                    end_index: batch.end_index,
                })
                .await?;
        }

        info!(
            day = %day,
            flushed = results.len(),
            continuing = next_batches.len(),
            errored = errored.len(),
            held = state.pending.len(),
            "continuing round complete"
        );

        let mut calls = vec![ChainCall::MintCoins {
            platform: self.config.platform,
            day,
            results,
            batches: next_batches,
        }
        .encode()?];
        if !errored.is_empty() {
            calls.push(
                ChainCall::LogErrorBatches {
                    platform: self.config.platform,
                    day,
                    batches: errored,
                }
                .encode()?,
            );
        }
        Ok(InvocationOutcome::Execute { calls })
    }

    /// The terminal round: no batches outstanding and none left to create.
    /// Settle held posts, flush every remaining tally, archive, clear the
    /// day's storage, and emit the finish call with the final running hash.
    async fn finish_round(
        &self,
        day: MintingDay,
        store: &EpochStore,
        mut state: EpochState,
    ) -> WorkerResult<InvocationOutcome> {
        let held = state.pending.drain();
        if !held.is_empty() {
            info!(day = %day, held = held.len(), "re-verifying high-engagement posts");
        }
        let verified = self.verifier.verify(held).await?;
        for post in verified {
            self.score_and_archive(&mut state, post);
        }

        let mut results: Vec<UserTally> = state.tallies.drain().map(|(_, tally)| tally).collect();
        results.sort_by_key(|tally| tally.user_index);

        self.upload_buffered(day, &mut state).await?;
        let running_hash = state.accumulator.running_hash_hex();

        self.sink.trigger_content_archive(day);
        store.clear_day().await?;

        info!(
            day = %day,
            users = results.len(),
            records = state.accumulator.records_uploaded(),
            running_hash = %running_hash,
            "minting day finished"
        );

        let mut calls = Vec::new();
        if !results.is_empty() {
            calls.push(
                ChainCall::MintCoins {
                    platform: self.config.platform,
                    day,
                    results,
                    batches: Vec::new(),
                }
                .encode()?,
            );
        }
        calls.push(
            ChainCall::FinishMinting {
                platform: self.config.platform,
                day,
                running_hash,
            }
            .encode()?,
        );
        Ok(InvocationOutcome::Execute { calls })
    }

    /// Route one fetched post: hold it for verification when its engagement
    /// is above the threshold, otherwise score it now. A post overflowing
    /// the bounded holding set falls back to normal scoring.
    fn ingest(&self, state: &mut EpochState, post: Post) {
        if state.pending.qualifies(&post) {
            if let Some(overflow) = state.pending.offer(post) {
                self.score_and_archive(state, overflow);
            }
        } else {
            self.score_and_archive(state, post);
        }
    }

    fn score_and_archive(&self, state: &mut EpochState, post: Post) {
        let tally = state
            .tallies
            .entry(post.user_index)
            .or_insert_with(|| UserTally::new(post.user_index));
        let processing = self.engine.score_post(tally, &post);
        if let Some(metrics) = &self.metrics {
            metrics
                .posts_scored_total
                .with_label_values(&[processing.as_str()])
                .inc();
        }
        if processing.counts() {
            state.accumulator.add(&post, processing);
        }
    }

    async fn upload_buffered(&self, day: MintingDay, state: &mut EpochState) -> WorkerResult<()> {
        if state.accumulator.buffered().is_empty() {
            return Ok(());
        }
        if !self
            .sink
            .save_records(day, state.accumulator.buffered())
            .await
        {
            if let Some(metrics) = &self.metrics {
                metrics.uploads_failed_total.inc();
            }
            return Err(WorkerError::UploadFailed);
        }
        if let Some(metrics) = &self.metrics {
            metrics.uploads_total.inc();
        }
        state.accumulator.mark_uploaded();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let outcome = InvocationOutcome::NotExecutable {
            reason: "event decode failed".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "notExecutable");
        assert_eq!(json["reason"], "event decode failed");

        let outcome = InvocationOutcome::Execute { calls: Vec::new() };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "execute");
        assert!(json["calls"].as_array().unwrap().is_empty());
    }
}
