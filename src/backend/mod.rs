//! Boundary to the remote analysis service.
//!
//! Wire types mirror the service's JSON contract exactly; the
//! [`AnalysisBackend`] trait is the seam tests mock. Conversions into the
//! domain model live here so nothing downstream touches raw wire data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::{EvaluationResult, Grade, RecommendationResult};
use crate::error::BackendError;

pub mod http;

pub use http::HttpAnalysisBackend;

/// `POST /evaluate/` request body. `elo` and `mv` are sent only when
/// grading a specific move against a specific opponent strength.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluateRequest {
    pub fen: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elo: Option<u32>,
    #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
    pub mv: Option<String>,
}

/// `POST /evaluate/` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    pub score_cp: Option<f64>,
    pub mate: Option<i32>,
    pub best_move: Option<String>,
    pub pv: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub grade_description: Option<String>,
    #[serde(default)]
    pub diff_cp: Option<f64>,
}

impl From<EvaluateResponse> for EvaluationResult {
    fn from(wire: EvaluateResponse) -> Self {
        // A forced mate wins over a score if the service ever sends both.
        let mate_in = wire.mate;
        let score_cp = if mate_in.is_some() {
            None
        } else {
            wire.score_cp.map(|cp| cp.round() as i32)
        };
        EvaluationResult {
            score_cp,
            mate_in,
            best_move: wire.best_move,
            principal_variation: wire.pv,
            grade: wire.grade.as_deref().and_then(Grade::from_label),
            grade_description: wire.grade_description,
            diff_cp: wire.diff_cp.map(|diff| diff.round() as i32),
        }
    }
}

/// `POST /recommend/` request body. `explain = false` suppresses the
/// natural-language coaching text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendRequest {
    pub fen: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elo: Option<u32>,
    pub explain: bool,
}

/// `POST /recommend/` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendResponse {
    #[serde(rename = "move")]
    pub mv: Option<String>,
    pub analysis: String,
}

impl From<RecommendResponse> for RecommendationResult {
    fn from(wire: RecommendResponse) -> Self {
        RecommendationResult {
            mv: wire.mv,
            analysis: wire.analysis,
        }
    }
}

/// `POST /chat/` request body. `history` is the transcript as it stood
/// before the message being sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<String>,
    pub fen: String,
}

/// `POST /chat/` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// The analysis service seen as three idempotent request/response calls.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, BackendError>;

    async fn recommend(&self, request: RecommendRequest)
        -> Result<RecommendResponse, BackendError>;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError>;
}
