use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::message::{GenerateRequest, GenerateResponse};

pub const GENERATE_PATH: &str = "/v1/generate";

/// Anything that can answer an analysis request.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Send the request in one round trip and return the service's messages
    /// in emission order.
    async fn generate(&self, request: &GenerateRequest) -> AnalysisResult<GenerateResponse>;
}

/// HTTP client for the analysis service.
///
/// Holds only the immutable configuration and a connection pool, so one
/// instance can serve concurrent calls.
pub struct AnalysisClient {
    client: Client,
    config: ClientConfig,
}

impl AnalysisClient {
    pub fn new(config: ClientConfig) -> AnalysisResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Like [`Analyzer::generate`], but gives up with
    /// [`AnalysisError::Cancelled`] as soon as `signal` resolves.
    pub async fn generate_with_cancel<F>(
        &self,
        request: &GenerateRequest,
        signal: F,
    ) -> AnalysisResult<GenerateResponse>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = signal => {
                tracing::debug!("analysis request cancelled");
                Err(AnalysisError::Cancelled)
            }
            result = self.generate(request) => result,
        }
    }

    pub async fn generate_with_deadline(
        &self,
        request: &GenerateRequest,
        deadline: Duration,
    ) -> AnalysisResult<GenerateResponse> {
        self.generate_with_cancel(request, tokio::time::sleep(deadline))
            .await
    }

    async fn post(&self, request: &GenerateRequest) -> AnalysisResult<GenerateResponse> {
        let url = format!(
            "{}{}",
            self.config.host.trim_end_matches('/'),
            GENERATE_PATH
        );
        tracing::debug!(url = %url, messages = request.messages.len(), "sending analysis request");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.credential.expose()),
            )
            .json(request)
            .send()
            .await?;

        let status = response.status();
        match status {
            status if status.is_success() => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body).map_err(AnalysisError::MalformedResponse)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(%status, "analysis request rejected");
                Err(AnalysisError::Authentication { status, body })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(%status, "analysis request failed");
                Err(AnalysisError::Status { status, body })
            }
        }
    }
}

#[async_trait]
impl Analyzer for AnalysisClient {
    async fn generate(&self, request: &GenerateRequest) -> AnalysisResult<GenerateResponse> {
        if request.messages.is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "request must contain at least one message".to_string(),
            ));
        }

        self.post(request).await
    }
}
