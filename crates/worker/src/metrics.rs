//! Prometheus metrics for worker invocations

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

pub struct WorkerMetrics {
    /// Fetch rounds executed.
    pub fetch_rounds_total: IntCounter,
    /// Batch fetches that failed.
    pub batch_failures_total: IntCounter,
    /// Posts scored, labeled by processing type.
    pub posts_scored_total: IntCounterVec,
    /// Successful archival uploads.
    pub uploads_total: IntCounter,
    /// Failed archival uploads.
    pub uploads_failed_total: IntCounter,
}

impl WorkerMetrics {
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let fetch_rounds_total = IntCounter::new(
            "engagemint_fetch_rounds_total",
            "Total number of batch fetch rounds",
        )?;

        let batch_failures_total = IntCounter::new(
            "engagemint_batch_failures_total",
            "Total number of failed batch fetches",
        )?;

        let posts_scored_total = IntCounterVec::new(
            Opts::new(
                "engagemint_posts_scored_total",
                "Total number of posts scored",
            ),
            &["processing"],
        )?;

        let uploads_total = IntCounter::new(
            "engagemint_uploads_total",
            "Total number of successful archival uploads",
        )?;

        let uploads_failed_total = IntCounter::new(
            "engagemint_uploads_failed_total",
            "Total number of failed archival uploads",
        )?;

        registry.register(Box::new(fetch_rounds_total.clone()))?;
        registry.register(Box::new(batch_failures_total.clone()))?;
        registry.register(Box::new(posts_scored_total.clone()))?;
        registry.register(Box::new(uploads_total.clone()))?;
        registry.register(Box::new(uploads_failed_total.clone()))?;

        Ok(Self {
            fetch_rounds_total,
            batch_failures_total,
            posts_scored_total,
            uploads_total,
            uploads_failed_total,
        })
    }
}
