//! # Batch-Minting Worker Orchestration
//!
//! This crate implements the off-chain orchestration for daily
//! social-engagement minting. It bridges on-chain minting events to the
//! social API, the scoring engine, and the archival server.
//!
//! ## Architecture
//!
//! ```text
//! Minting Event → BatchManager → BatchFetcher → ScoringEngine
//!                                                    ↓
//!             Chain Calls ← MintingWorker ← RecordAccumulator/RecordSink
//! ```
//!
//! ## Invocation Lifecycle
//!
//! 1. Decode the trigger event into `{minting day, cursor batches}`
//! 2. Restore per-day state (tallies, held posts, running hash) from storage
//! 3. Reconcile and expand pagination batches under the concurrency limit
//! 4. Fetch one page per batch concurrently; score and archive the posts
//! 5. Continuing round: emit a mint call with flushed tallies and the next
//!    cursor array (plus an error-batches call when a range exhausted its
//!    retry budget)
//! 6. Terminal round: re-verify held high-engagement posts, flush everything,
//!    clear the day's storage, and emit the finish call with the running hash
//!
//! Any failure before call construction yields a non-executable outcome so
//! the scheduler can safely re-trigger from the last persisted checkpoint.

pub mod batches;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod runner;
pub mod verifier;

pub use batches::{BatchManager, BatchPlan};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use fetcher::{BatchFetcher, FetchOutcome};
pub use metrics::{MetricsError, WorkerMetrics};
pub use runner::{InvocationOutcome, MintingWorker};
pub use verifier::EngagementVerifier;
