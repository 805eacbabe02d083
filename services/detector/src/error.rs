use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use veritext_auth_types::token::TokenError;

/// Detector service error variants.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("{0}")]
    Validation(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    TokenInvalid,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("insufficient credits")]
    InsufficientCredits,
    #[error("not found")]
    NotFound,
    #[error("analysis service is temporarily unavailable, please try again")]
    UpstreamUnavailable,
    #[error("could not save the result, please try again")]
    Persistence(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl DetectorError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InsufficientCredits => "INSUFFICIENT_CREDITS",
            Self::NotFound => "NOT_FOUND",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for DetectorError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Self::TokenExpired,
            TokenError::InvalidSignature | TokenError::Malformed => Self::TokenInvalid,
            TokenError::Signing => Self::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<JsonRejection> for DetectorError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for DetectorError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for DetectorError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for DetectorError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 4xx are expected client outcomes and already visible in the trace layer.
        match &self {
            Self::Persistence(e) | Self::Internal(e) => {
                tracing::error!(error = format!("{e:#}"), kind = self.kind(), "request failed");
            }
            Self::UpstreamUnavailable => {
                tracing::error!(kind = self.kind(), "request failed");
            }
            _ => {}
        }
        let body = serde_json::json!({
            "code": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Failures of the external scoring call, before they are collapsed into
/// [`DetectorError::UpstreamUnavailable`] by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("input exceeds {limit} characters")]
    InputTooLong { limit: usize },
    #[error("provider rejected the request with status {status}")]
    Rejected { status: u16 },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ScoringError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
