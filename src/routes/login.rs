use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth;
use crate::config::ServerConfig;
use crate::error::{GatewayError, Result};
use crate::oauth::state::ReturnPolicy;
use crate::oauth::{self, provider, session};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn return_policy(server: &ServerConfig) -> ReturnPolicy<'_> {
    ReturnPolicy {
        allowed_origin: &server.allowed_origin,
        default_target: &server.default_redirect,
    }
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

/// Tell the front-end the login happened and when the session runs out.
fn with_login_marker(target: &str, exp: u64) -> String {
    let sep = if target.contains('?') { '&' } else { '?' };
    format!("{target}{sep}blog_login=success&exp={exp}")
}

/// GET /login: redirect to the identity provider with a fresh signed state
pub async fn login(
    State(state): State<SharedState>,
    params: std::result::Result<Query<LoginParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = params?;
    let server = &state.config.server;
    let csrf = oauth::state::encode(
        params.return_to.as_deref(),
        &return_policy(server),
        &state.signing_key,
        oauth::now_millis(),
    )?;

    let location = provider::authorize_url(&state.config.oauth, &server.callback_url(), &csrf);
    tracing::debug!("Redirecting to identity provider");
    Ok(found(location))
}

/// GET /callback: finish the handshake and issue the session cookie
pub async fn callback(
    State(state): State<SharedState>,
    params: std::result::Result<Query<CallbackParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = params?;
    let server = &state.config.server;
    let oauth_cfg = &state.config.oauth;

    if let Some(error) = params.error {
        tracing::warn!(%error, "Identity provider returned an error");
        return Err(GatewayError::OAuth(
            params.error_description.unwrap_or(error),
        ));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(GatewayError::NoCodeReceived)?;
    let csrf = params
        .state
        .filter(|s| !s.is_empty())
        .ok_or(GatewayError::MissingState)?;

    let redirect_uri = server.callback_url();
    let identity = {
        let access_token =
            provider::exchange_code(&state.http, oauth_cfg, &code, &redirect_uri).await?;
        provider::fetch_identity(&state.http, oauth_cfg, &access_token).await?
    };

    if identity != oauth_cfg.allowed_identity {
        tracing::warn!(%identity, "Login refused for identity outside the allow-list");
        return Err(GatewayError::AccessDenied);
    }

    let now = oauth::now_millis();

    // The identity is already proven here, so a bad state only costs the
    // caller their chosen return target.
    let return_target = match oauth::state::decode(
        &csrf,
        &return_policy(server),
        &state.signing_key,
        now,
        state.state_max_age_millis(),
    ) {
        Ok(verified) => {
            tracing::debug!(issued_at = verified.issued_at, "Login state verified");
            verified.return_target
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login state rejected; using default redirect");
            server.default_redirect.clone()
        }
    };

    let ttl = state.session_ttl_millis();
    let token = session::encode(&identity, now, ttl, &state.signing_key)?;
    let cookie = auth::session_cookie(&server.cookie_name, &token, server.session_ttl_secs);
    let location = with_login_marker(&return_target, now.saturating_add(ttl));

    tracing::info!(%identity, "Login succeeded");
    Ok((
        StatusCode::FOUND,
        [(LOCATION, location), (SET_COOKIE, cookie)],
    )
        .into_response())
}

/// ANY /logout: expire the session cookie client-side
pub async fn logout(State(state): State<SharedState>) -> impl IntoResponse {
    let cookie = auth::clear_session_cookie(&state.config.server.cookie_name);
    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}
