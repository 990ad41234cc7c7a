//! Post scoring for the minting worker
//!
//! Pure logic, no I/O: keyword classification with per-day category caps,
//! and the bounded holding set for high-engagement posts awaiting
//! authoritative re-verification.

mod engine;
mod pending;

pub use engine::{KeywordForm, ScoringEngine, STRIP_PUNCTUATION};
pub use pending::{PendingSet, DEFAULT_LIKES_THRESHOLD, DEFAULT_MAX_PENDING};
