//! `reqwest` implementation of the analysis-service boundary.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::backend::{
    AnalysisBackend, ChatRequest, ChatResponse, EvaluateRequest, EvaluateResponse,
    RecommendRequest, RecommendResponse,
};
use crate::config::CoachConfig;
use crate::error::BackendError;

/// HTTP client for the analysis service.
pub struct HttpAnalysisBackend {
    http: Client,
    base_url: String,
}

impl HttpAnalysisBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &CoachConfig) -> Self {
        Self::new(config.backend_url.clone())
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("[HTTP] POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn evaluate(&self, request: EvaluateRequest) -> Result<EvaluateResponse, BackendError> {
        self.post_json("/evaluate/", &request).await
    }

    async fn recommend(
        &self,
        request: RecommendRequest,
    ) -> Result<RecommendResponse, BackendError> {
        self.post_json("/recommend/", &request).await
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.post_json("/chat/", &request).await
    }
}
