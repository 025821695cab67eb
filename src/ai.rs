//! Remote AI analysis client: the trait the orchestrator calls through, a
//! retry helper, and the HTTP implementation.

use crate::errors::AiClientError;
use crate::types::{AiAnalysisRequest, AiInsights, QuickAiInsights};
use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;

#[async_trait]
pub trait AiAnalysisClient: Send + Sync {
    async fn analyze(&self, req: &AiAnalysisRequest) -> Result<AiInsights, AiClientError>;
    async fn quick_analyze(
        &self,
        req: &AiAnalysisRequest,
    ) -> Result<QuickAiInsights, AiClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retriable error, or the
/// attempt budget is spent. `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, AiClientError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AiClientError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retriable() && attempt < attempts => {
                let mut delay = policy.delay_for(attempt);
                if let Some(hint) = err.retry_after() {
                    delay = delay.max(hint).min(policy.max_delay);
                }
                tracing::debug!(
                    attempt,
                    max_attempts = attempts,
                    ?delay,
                    "ai call failed, retrying: {err}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpAiClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

/// JSON-over-HTTP client for the analysis service.
#[derive(Debug, Clone)]
pub struct HttpAiClient {
    http: reqwest::Client,
    config: HttpAiClientConfig,
}

impl HttpAiClient {
    pub fn new(config: HttpAiClientConfig) -> Result<Self, AiClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AiClientError::Unavailable(err.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, AiClientError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.url(path);
        retry_with_backoff(&self.config.retry, |attempt| {
            let url = url.clone();
            async move {
                tracing::debug!(%url, attempt, "calling ai service");
                self.send_once(&url, body).await
            }
        })
        .await
    }

    async fn send_once<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, AiClientError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;

        if status.is_success() {
            return serde_json::from_slice(&bytes)
                .map_err(|err| AiClientError::Decode(err.to_string()));
        }
        let message = String::from_utf8_lossy(&bytes).chars().take(512).collect();
        Err(classify_status(status, message, retry_after))
    }

    fn transport_error(&self, err: reqwest::Error) -> AiClientError {
        if err.is_timeout() {
            AiClientError::Timeout(self.config.timeout)
        } else if err.is_decode() {
            AiClientError::Decode(err.to_string())
        } else {
            AiClientError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl AiAnalysisClient for HttpAiClient {
    async fn analyze(&self, req: &AiAnalysisRequest) -> Result<AiInsights, AiClientError> {
        self.post("/analyze", req).await
    }

    async fn quick_analyze(
        &self,
        req: &AiAnalysisRequest,
    ) -> Result<QuickAiInsights, AiClientError> {
        self.post("/quick-analyze", req).await
    }
}

fn classify_status(status: StatusCode, message: String, retry_after: Option<Duration>) -> AiClientError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AiClientError::Server {
            status: status.as_u16(),
            message,
            retry_after,
        }
    } else {
        AiClientError::Client {
            status: status.as_u16(),
            message,
        }
    }
}

fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
