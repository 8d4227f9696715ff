//! Error surface shared by the codecs, the OAuth handshake and the proxy.
//!
//! Every variant renders as `{ "error": <message> }` with a fixed status.
//! Messages are deliberately generic: they never carry key material, raw
//! token contents or upstream credentials.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("signing primitive unavailable")]
    CryptoUnavailable,

    #[error("malformed query string")]
    MalformedQuery,

    #[error("malformed state parameter")]
    MalformedState,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("state parameter expired")]
    StateExpired,

    #[error("invalid session")]
    InvalidSession,

    #[error("invalid session data")]
    InvalidSessionData,

    #[error("session expired or invalid")]
    SessionExpiredOrInvalid,

    #[error("no authorization code received")]
    NoCodeReceived,

    #[error("missing state parameter, possible CSRF attempt")]
    MissingState,

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("access denied")]
    AccessDenied,

    #[error("login required")]
    LoginRequired,

    #[error("upstream credential not configured")]
    UpstreamNotConfigured,

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("not found")]
    NotFound,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedQuery
            | GatewayError::MalformedState
            | GatewayError::NoCodeReceived
            | GatewayError::OAuth(_) => StatusCode::BAD_REQUEST,
            GatewayError::InvalidSignature
            | GatewayError::StateExpired
            | GatewayError::InvalidSession
            | GatewayError::InvalidSessionData
            | GatewayError::SessionExpiredOrInvalid
            | GatewayError::LoginRequired => StatusCode::UNAUTHORIZED,
            GatewayError::MissingState | GatewayError::AccessDenied => StatusCode::FORBIDDEN,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::CryptoUnavailable
            | GatewayError::UpstreamNotConfigured
            | GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::UpstreamTimeout
        } else {
            // Strip the URL so query strings never reach the client.
            GatewayError::Upstream(e.without_url().to_string())
        }
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(e: QueryRejection) -> Self {
        tracing::debug!(error = %e.body_text(), "Query string rejected");
        GatewayError::MalformedQuery
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
