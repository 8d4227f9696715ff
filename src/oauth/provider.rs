//! Calls to the identity provider: authorize URL, code exchange, identity lookup.
//!
//! Endpoints default to GitHub's OAuth app flow and can be pointed elsewhere
//! through `[oauth]` in the config file.

use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::error::{GatewayError, Result};
use crate::proxy::USER_AGENT;

/// Build the provider authorize URL the browser is redirected to.
pub fn authorize_url(config: &OAuthConfig, redirect_uri: &str, state: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", config.scope.as_str()),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url, query)
}

/// Token endpoint reply. Providers answer 200 with `error` set on failure.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// Exchange an authorization code for an access token.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<String> {
    let response = http
        .post(&config.token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?;

    let body: TokenResponse = response.json().await?;

    if let Some(error) = body.error {
        return Err(GatewayError::OAuth(body.error_description.unwrap_or(error)));
    }

    body.access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GatewayError::OAuth("no access token in provider response".to_string()))
}

/// Look up the login name the access token belongs to.
pub async fn fetch_identity(
    http: &reqwest::Client,
    config: &OAuthConfig,
    access_token: &str,
) -> Result<String> {
    let response = http
        .get(&config.user_url)
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Upstream(format!(
            "identity lookup returned HTTP {status}"
        )));
    }

    let user: UserResponse = response.json().await?;
    Ok(user.login)
}
