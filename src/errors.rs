use actix_web::{error::JsonPayloadError, http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const ERROR_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy)]
pub enum ErrorCode {
    InvalidRequest,
    InsufficientData,
    SourceUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InsufficientData => "INSUFFICIENT_DATA",
            ErrorCode::SourceUnavailable => "SOURCE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::InsufficientData => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::SourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn retry_hint_ms(&self) -> u64 {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InsufficientData => 0,
            ErrorCode::SourceUnavailable => 30_000,
            ErrorCode::InternalError => 60_000,
        }
    }
}

/// Failures that reach callers of the orchestrator. AI-layer problems never
/// show up here; they degrade into a local result instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AnalysisError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            AnalysisError::InsufficientData(_) => ErrorCode::InsufficientData,
            AnalysisError::SourceUnavailable(_) => ErrorCode::SourceUnavailable,
            AnalysisError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn retry_hint_ms(&self) -> u64 {
        self.code().retry_hint_ms()
    }
}

/// Classified failure of a remote AI call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AiClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("client error {status}: {message}")]
    Client { status: u16, message: String },
    #[error("server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("ai service unavailable: {0}")]
    Unavailable(String),
}

impl AiClientError {
    /// 4xx and decode failures are final; transport and 5xx failures are not.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AiClientError::Network(_) | AiClientError::Timeout(_) | AiClientError::Server { .. }
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AiClientError::Server { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub request_id: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    inner: AnalysisError,
    context: ErrorContext,
}

impl ApiError {
    pub fn new(inner: AnalysisError) -> Self {
        Self {
            inner,
            context: ErrorContext::default(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.context.request_id = Some(request_id.into());
        self
    }
}

impl From<AnalysisError> for ApiError {
    fn from(value: AnalysisError) -> Self {
        ApiError::new(value)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.inner.code().status()
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Debug, Serialize)]
        struct ErrorBody {
            schema_version: &'static str,
            code: &'static str,
            message: String,
            request_id: String,
            retry_hint_ms: u64,
        }

        let request_id = self
            .context
            .request_id
            .clone()
            .unwrap_or_else(|| "unknown".into());
        let body = ErrorBody {
            schema_version: ERROR_SCHEMA_VERSION,
            code: self.inner.code().as_str(),
            message: self.inner.to_string(),
            request_id,
            retry_hint_ms: self.inner.retry_hint_ms(),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

pub fn json_error(err: JsonPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    ApiError::new(AnalysisError::InvalidRequest(err.to_string())).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_analysis_error_maps_to_an_envelope_code() {
        let cases = [
            (AnalysisError::InvalidRequest("x".into()), "INVALID_REQUEST", 400, 0),
            (AnalysisError::InsufficientData("x".into()), "INSUFFICIENT_DATA", 422, 0),
            (AnalysisError::SourceUnavailable("x".into()), "SOURCE_UNAVAILABLE", 503, 30_000),
            (AnalysisError::Internal("x".into()), "INTERNAL_ERROR", 500, 60_000),
        ];
        for (err, code, status, retry) in cases {
            assert_eq!(err.code().as_str(), code);
            assert_eq!(err.code().status().as_u16(), status);
            assert_eq!(err.retry_hint_ms(), retry);
        }
    }
}
