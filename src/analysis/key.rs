//! Request keys: canonical identity for analysis queries.
//!
//! A key is derived purely from the current position, the effective
//! parameters, and the request kind. It serves double duty as the cache
//! index and as the staleness comparator: a result stays authoritative only
//! while its originating key equals the freshly derived key for that kind.

use std::fmt;

use crate::params::ParameterSet;

/// The two kinds of analysis query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Evaluate,
    Recommend,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Evaluate => f.write_str("evaluate"),
            RequestKind::Recommend => f.write_str("recommend"),
        }
    }
}

/// Value-equal tuple identifying one analysis query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub kind: RequestKind,
    pub fen: String,
    pub depth: u32,
    /// Opponent rating the engine should assume; absent for a plain
    /// position evaluation.
    pub skill: Option<u32>,
    pub coaching: bool,
    /// SAN of the move being graded. Distinguishes "evaluate this position"
    /// from "evaluate this position as the outcome of move M"; the latter
    /// also weighs the pre-move position.
    pub graded_move: Option<String>,
}

impl RequestKey {
    /// Plain evaluation of the current position.
    pub fn evaluate(fen: &str, params: &ParameterSet) -> Self {
        Self {
            kind: RequestKind::Evaluate,
            fen: fen.to_string(),
            depth: params.search_depth(),
            skill: None,
            coaching: params.coaching_enabled(),
            graded_move: None,
        }
    }

    /// Evaluation grading the move that just produced this position.
    pub fn grade_move(fen: &str, params: &ParameterSet, san: &str) -> Self {
        Self {
            kind: RequestKind::Evaluate,
            fen: fen.to_string(),
            depth: params.search_depth(),
            skill: Some(params.effective_skill()),
            coaching: params.coaching_enabled(),
            graded_move: Some(san.to_string()),
        }
    }

    /// Best-move recommendation for the current position.
    pub fn recommend(fen: &str, params: &ParameterSet) -> Self {
        Self {
            kind: RequestKind::Recommend,
            fen: fen.to_string(),
            depth: params.search_depth(),
            skill: Some(params.effective_skill()),
            coaching: params.coaching_enabled(),
            graded_move: None,
        }
    }
}
