//! Error types for the coaching client core.
//!
//! Rules violations stay local to the operation that attempted them; backend
//! failures are recorded per request and never abort unrelated views.

use thiserror::Error;

/// Errors surfaced by session-level operations.
#[derive(Error, Debug)]
pub enum CoachError {
    /// The rules engine rejected a move attempt. The position is unchanged
    /// and no analysis request is derived.
    #[error("illegal move: {0}")]
    InvalidMove(String),

    /// An explicit refresh or retry was requested before any analysis has
    /// been started for the session. Rendered as "not ready", not a fault.
    #[error("no position under analysis")]
    MissingPosition,

    /// A position encoding could not be parsed.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// The analysis backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Failures crossing the analysis-backend boundary.
///
/// Stored on the cache entry that issued the call; retried only on the next
/// explicit request for the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The service could not be reached at all.
    #[error("analysis backend unreachable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success HTTP status.
    #[error("analysis backend returned HTTP {0}")]
    Status(u16),

    /// The service answered, but the body did not match the wire contract.
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Result type alias for session operations.
pub type CoachResult<T> = Result<T, CoachError>;
