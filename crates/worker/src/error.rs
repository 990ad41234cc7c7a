//! Error types for worker invocations.

use thiserror::Error;

/// Top-level error type for one worker invocation.
///
/// Any of these surfacing out of the orchestrator turns the invocation into
/// a non-executable outcome: no transaction is emitted and no state past the
/// last checkpoint is persisted.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("storage error: {0}")]
    Storage(#[from] engagemint_storage::StorageError),

    #[error("social API error: {0}")]
    Social(#[from] engagemint_social::SocialError),

    #[error("chain boundary error: {0}")]
    Chain(#[from] engagemint_chain::ChainError),

    #[error("archive state error: {0}")]
    Archive(#[from] engagemint_archive::ArchiveError),

    /// The API returned a handle the directory snapshot does not know.
    /// Always fatal: it means the handle cache and the index assignment have
    /// drifted, and scoring against it would corrupt the accounting.
    #[error("unresolvable handle in API response: {handle}")]
    HandleResolution { handle: String },

    /// The contract handed back a range whose cached handle list is gone.
    #[error("missing handle cache for batch [{start_index}, {end_index})")]
    MissingHandleCache { start_index: u32, end_index: u32 },

    /// The archival server did not accept this round's records; the running
    /// hash must not advance past what was actually archived.
    #[error("archival upload failed; aborting invocation")]
    UploadFailed,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = WorkerError::HandleResolution {
            handle: "ghost".to_string(),
        };
        assert!(error.to_string().contains("ghost"));

        let error = WorkerError::MissingHandleCache {
            start_index: 40,
            end_index: 60,
        };
        assert!(error.to_string().contains("[40, 60)"));
    }

    #[test]
    fn test_error_conversion() {
        let storage = engagemint_storage::StorageError::Backend("down".to_string());
        let error: WorkerError = storage.into();
        assert!(matches!(error, WorkerError::Storage(_)));
    }
}
