use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};

use crate::auth;
use crate::error::Result;
use crate::proxy::{self, Tier};
use crate::state::SharedState;

/// POST /*: GraphQL proxy
pub async fn graphql(
    State(state): State<SharedState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let upstream = &state.config.upstream;
    let tier = Tier::classify(uri.path(), &upstream.private_paths);

    if tier == Tier::Private {
        let session = auth::authenticate(&state, &headers).inspect_err(|e| {
            tracing::debug!(path = uri.path(), error = %e, "Private GraphQL call without a valid session");
        })?;
        tracing::debug!(
            identity = %session.identity,
            expires_at = session.expires_at,
            "Private GraphQL call"
        );
    }

    let token = tier.credential(upstream)?;
    let reply = proxy::forward(&state.http, &upstream.graphql_url, token, body).await?;

    Ok(([(CONTENT_TYPE, "application/json")], reply).into_response())
}
