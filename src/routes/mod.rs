//! HTTP surface and dispatch order.
//!
//! Priority: any `OPTIONS` is a preflight; then `/login`, `/callback`,
//! `/logout`; then any `POST` is a GraphQL call; then `GET /auth-status`;
//! everything else is 404. Every response carries the same CORS headers.

pub mod graphql;
pub mod login;
pub mod status;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;

use crate::error::{GatewayError, Result};
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/login",
            get(login::login).fallback(method_not_allowed),
        )
        .route(
            "/callback",
            get(login::callback).fallback(method_not_allowed),
        )
        .route("/logout", any(login::logout))
        .route(
            "/auth-status",
            get(status::auth_status)
                .post(graphql::graphql)
                .fallback(not_found),
        )
        .fallback(post_or_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

async fn not_found() -> GatewayError {
    GatewayError::NotFound
}

/// Any other path: POST goes to the proxy, the rest is unknown.
async fn post_or_not_found(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if method == Method::POST {
        graphql::graphql(State(state), uri, headers, body).await
    } else {
        Err(GatewayError::NotFound)
    }
}

/// Answer preflights and stamp the CORS header set on every response.
async fn cors(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    if let Ok(origin) = HeaderValue::from_str(&state.config.server.allowed_origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-Requested-With"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(VARY, HeaderValue::from_static("Origin"));
    response
}
