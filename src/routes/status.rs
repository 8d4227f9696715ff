use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::auth;
use crate::state::SharedState;

/// GET /auth-status: always 200; reports whether the session cookie verifies
pub async fn auth_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let is_authorized = auth::authenticate(&state, &headers).is_ok();
    Json(serde_json::json!({ "isAuthorized": is_authorized }))
}
