use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

/// Read-only per-process state shared by every handler.
pub struct AppState {
    pub config: Config,
    /// Decoded `server.state_secret`.
    pub signing_key: Vec<u8>,
    /// Shared client for provider and GraphQL calls, with the upstream timeout applied.
    pub http: reqwest::Client,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config) -> Result<SharedState, String> {
        let signing_key = config.server.signing_key()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Arc::new(Self {
            config,
            signing_key,
            http,
        }))
    }

    pub fn session_ttl_millis(&self) -> u64 {
        self.config.server.session_ttl_secs.saturating_mul(1000)
    }

    pub fn state_max_age_millis(&self) -> u64 {
        self.config.server.state_max_age_secs.saturating_mul(1000)
    }
}
