//! Forwarding GraphQL calls to the upstream API.
//!
//! The request body is passed through byte-for-byte. The reply is checked to
//! be JSON and then relayed unchanged, GraphQL `errors` included.

use axum::body::Bytes;
use serde::de::IgnoredAny;

use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};

/// Identifies this gateway to the provider and the GraphQL API.
pub const USER_AGENT: &str = "graphql-edge-gateway";

/// Content type sent upstream; the front-end posts with this type to avoid
/// a CORS preflight and the upstream accepts it.
const FORWARD_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Authorization tier of a proxied call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Public,
    Private,
}

impl Tier {
    pub fn classify(path: &str, private_paths: &[String]) -> Self {
        if private_paths.iter().any(|p| p == path) {
            Tier::Private
        } else {
            Tier::Public
        }
    }

    /// The upstream credential for this tier. An unset or empty token is a
    /// configuration fault, never a fallback to the other tier.
    pub fn credential(self, upstream: &UpstreamConfig) -> Result<&str> {
        let token = match self {
            Tier::Public => upstream.public_token.as_deref(),
            Tier::Private => upstream.private_token.as_deref(),
        };
        token
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::UpstreamNotConfigured)
    }
}

/// POST `body` to the GraphQL endpoint as `token` and return the JSON reply.
pub async fn forward(
    http: &reqwest::Client,
    graphql_url: &str,
    token: &str,
    body: Bytes,
) -> Result<Bytes> {
    let response = http
        .post(graphql_url)
        .bearer_auth(token)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .header("X-Requested-With", "XMLHttpRequest")
        .header(reqwest::header::CONTENT_TYPE, FORWARD_CONTENT_TYPE)
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let bytes = response.bytes().await?;

    if serde_json::from_slice::<IgnoredAny>(&bytes).is_err() {
        tracing::error!(%status, "GraphQL upstream returned a non-JSON body");
        return Err(GatewayError::Upstream(format!(
            "upstream returned non-JSON response (HTTP {status})"
        )));
    }

    Ok(bytes)
}
