//! On-chain boundary for the minting worker
//!
//! The worker consumes one strongly-typed trigger event per invocation and
//! emits function-call encodings (contract function name plus JSON-shaped
//! arguments). Signing and submission are the embedder's concern; this crate
//! only guarantees that what crosses the boundary is well-formed.

use engagemint_types::{Batch, MintingDay, Platform, UserTally};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// The trigger payload did not decode into a [`MintingEvent`]. Kept
    /// distinct from downstream failures so a malformed event is never
    /// mistaken for a business error.
    #[error("event decode failed: {0}")]
    EventDecode(String),

    #[error("call encode failed: {0}")]
    CallEncode(String),
}

/// The on-chain event that triggers one worker invocation.
///
/// Emitted with empty batches at the start of a minting day and after every
/// worker transaction with the cursor array the worker handed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintingEvent {
    pub minting_day_timestamp: MintingDay,
    pub batches: Vec<Batch>,
}

impl MintingEvent {
    /// Decode the raw event payload at the boundary.
    pub fn decode(payload: &[u8]) -> Result<Self, ChainError> {
        serde_json::from_slice(payload).map_err(|error| ChainError::EventDecode(error.to_string()))
    }

    /// Whether this event opens the day (no cursor state outstanding).
    pub fn is_epoch_start(&self) -> bool {
        self.batches.is_empty()
    }
}

/// An encoded contract call ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallData {
    pub function: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MintCoinsArgs<'a> {
    results: &'a [UserTally],
    minting_day_timestamp: MintingDay,
    batches: &'a [Batch],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBatchesArgs<'a> {
    minting_day_timestamp: MintingDay,
    batches: &'a [Batch],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishMintingArgs<'a> {
    minting_day_timestamp: MintingDay,
    running_hash: &'a str,
}

/// The contract calls this worker can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    /// Flush ready tallies and hand the next cursor array back.
    MintCoins {
        platform: Platform,
        day: MintingDay,
        results: Vec<UserTally>,
        batches: Vec<Batch>,
    },
    /// Report ranges that exhausted their retry budget.
    LogErrorBatches {
        platform: Platform,
        day: MintingDay,
        batches: Vec<Batch>,
    },
    /// Terminal call carrying the final running hash.
    FinishMinting {
        platform: Platform,
        day: MintingDay,
        running_hash: String,
    },
}

impl ChainCall {
    pub fn function_name(&self) -> String {
        match self {
            ChainCall::MintCoins { platform, .. } => {
                format!("mintCoinsFor{}Users", platform.call_infix())
            }
            ChainCall::LogErrorBatches { platform, .. } => {
                format!("log{}ErrorBatches", platform.call_infix())
            }
            ChainCall::FinishMinting { platform, .. } => {
                format!("finish{}Minting", platform.call_infix())
            }
        }
    }

    pub fn encode(&self) -> Result<CallData, ChainError> {
        let args = match self {
            ChainCall::MintCoins {
                day,
                results,
                batches,
                ..
            } => serde_json::to_value(MintCoinsArgs {
                results,
                minting_day_timestamp: *day,
                batches,
            }),
            ChainCall::LogErrorBatches { day, batches, .. } => {
                serde_json::to_value(ErrorBatchesArgs {
                    minting_day_timestamp: *day,
                    batches,
                })
            }
            ChainCall::FinishMinting {
                day, running_hash, ..
            } => serde_json::to_value(FinishMintingArgs {
                minting_day_timestamp: *day,
                running_hash,
            }),
        }
        .map_err(|error| ChainError::CallEncode(error.to_string()))?;

        Ok(CallData {
            function: self.function_name(),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> MintingDay {
        MintingDay::new(1_700_006_400)
    }

    #[test]
    fn test_event_decode() {
        let payload = format!(
            r#"{{"mintingDayTimestamp": {}, "batches": [
                {{"startIndex": 0, "endIndex": 20, "nextCursor": "c1", "errorCount": 0}}
            ]}}"#,
            day().timestamp()
        );

        let event = MintingEvent::decode(payload.as_bytes()).unwrap();
        assert_eq!(event.minting_day_timestamp, day());
        assert_eq!(event.batches.len(), 1);
        assert_eq!(event.batches[0].next_cursor, "c1");
        assert!(!event.is_epoch_start());
    }

    #[test]
    fn test_event_decode_failure_is_distinct() {
        let result = MintingEvent::decode(b"not json");
        assert!(matches!(result, Err(ChainError::EventDecode(_))));
    }

    #[test]
    fn test_epoch_start() {
        let event = MintingEvent {
            minting_day_timestamp: day(),
            batches: Vec::new(),
        };
        assert!(event.is_epoch_start());
    }

    #[test]
    fn test_function_names_embed_platform() {
        let mint = ChainCall::MintCoins {
            platform: Platform::Twitter,
            day: day(),
            results: Vec::new(),
            batches: Vec::new(),
        };
        assert_eq!(mint.function_name(), "mintCoinsForTwitterUsers");

        let errors = ChainCall::LogErrorBatches {
            platform: Platform::Farcaster,
            day: day(),
            batches: Vec::new(),
        };
        assert_eq!(errors.function_name(), "logFarcasterErrorBatches");

        let finish = ChainCall::FinishMinting {
            platform: Platform::Farcaster,
            day: day(),
            running_hash: "ab".to_string(),
        };
        assert_eq!(finish.function_name(), "finishFarcasterMinting");
    }

    #[test]
    fn test_mint_call_arg_shape() {
        let mut tally = UserTally::new(4);
        tally.posts = 2;
        tally.simple_posts = 2;
        tally.likes = 9;

        let call = ChainCall::MintCoins {
            platform: Platform::Twitter,
            day: day(),
            results: vec![tally],
            batches: vec![Batch::new(0, 20)],
        };

        let encoded = call.encode().unwrap();
        assert_eq!(
            encoded.args["mintingDayTimestamp"],
            u64::from(day().timestamp())
        );
        assert_eq!(encoded.args["results"][0]["userIndex"], 4);
        assert_eq!(encoded.args["results"][0]["likes"], 9);
        assert_eq!(encoded.args["batches"][0]["startIndex"], 0);
    }

    #[test]
    fn test_finish_call_arg_shape() {
        let call = ChainCall::FinishMinting {
            platform: Platform::Twitter,
            day: day(),
            running_hash: "deadbeef".to_string(),
        };
        let encoded = call.encode().unwrap();
        assert_eq!(encoded.args["runningHash"], "deadbeef");
    }
}
