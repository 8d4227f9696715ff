use serde::Deserialize;
use std::fmt;
use std::path::Path;

const DAY_SECS: u64 = 24 * 60 * 60;
const MAX_TTL_SECS: u64 = 365 * DAY_SECS;

/// Top-level configuration parsed from TOML.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Server-level configuration.
#[derive(Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// External base URL of this gateway; the OAuth callback is `{public_url}/callback`.
    pub public_url: String,
    /// Base64 secret used to HMAC-sign state parameters and session tokens.
    pub state_secret: String,
    /// Front-end origin: the CORS allow-origin and the only acceptable
    /// post-login redirect prefix.
    pub allowed_origin: String,
    /// Where to send the browser after login when no usable target was given.
    pub default_redirect: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Validity window for login state parameters. Defaults to the session
    /// TTL; a login attempt rarely needs more than a few minutes.
    #[serde(default = "default_session_ttl")]
    pub state_max_age_secs: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_session_ttl() -> u64 {
    14 * DAY_SECS
}

fn default_cookie_name() -> String {
    "blog_session".to_string()
}

/// Identity provider settings and the single identity allowed to log in.
#[derive(Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub allowed_identity: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_user_url")]
    pub user_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_authorize_url() -> String {
    "https://github.com/login/oauth/authorize".to_string()
}

fn default_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_user_url() -> String {
    "https://api.github.com/user".to_string()
}

fn default_scope() -> String {
    "read:user".to_string()
}

/// The GraphQL API and the two credentials used to call it.
#[derive(Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default)]
    pub public_token: Option<String>,
    #[serde(default)]
    pub private_token: Option<String>,
    /// Request paths that require a session and use the private token.
    #[serde(default = "default_private_paths")]
    pub private_paths: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            public_token: None,
            private_token: None,
            private_paths: default_private_paths(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_private_paths() -> Vec<String> {
    vec!["/private".to_string(), "/private/graphql".to_string()]
}

fn default_timeout_secs() -> u64 {
    10
}

// Secrets stay out of logs and panic messages.
fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("public_url", &self.public_url)
            .field("state_secret", &redacted(&self.state_secret))
            .field("allowed_origin", &self.allowed_origin)
            .field("default_redirect", &self.default_redirect)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("state_max_age_secs", &self.state_max_age_secs)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("allowed_identity", &self.allowed_identity)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("user_url", &self.user_url)
            .field("scope", &self.scope)
            .finish()
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("graphql_url", &self.graphql_url)
            .field("public_token", &self.public_token.as_deref().map(redacted))
            .field("private_token", &self.private_token.as_deref().map(redacted))
            .field("private_paths", &self.private_paths)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ServerConfig {
    /// Raw signing key. Only valid after `validate`.
    pub fn signing_key(&self) -> Result<Vec<u8>, String> {
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &self.state_secret)
            .map_err(|e| format!("server.state_secret is not valid base64: {e}"))
    }

    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.public_url)
    }
}

/// Load and validate config from a TOML file, applying environment variable overrides.
pub fn load_config(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let mut config: Config =
        toml::from_str(&content).map_err(|e| format!("Failed to parse TOML config: {e}"))?;

    apply_env_overrides(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Apply environment variable overrides for secrets.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("GATEWAY_STATE_SECRET") {
        config.server.state_secret = val;
    }
    if let Ok(val) = std::env::var("GATEWAY_CLIENT_SECRET") {
        config.oauth.client_secret = val;
    }
    if let Ok(val) = std::env::var("GATEWAY_PUBLIC_TOKEN") {
        config.upstream.public_token = Some(val);
    }
    if let Ok(val) = std::env::var("GATEWAY_PRIVATE_TOKEN") {
        config.upstream.private_token = Some(val);
    }
}

/// Validate the entire configuration. Returns an error string on failure.
pub fn validate(config: &Config) -> Result<(), String> {
    validate_server(&config.server)?;
    validate_oauth(&config.oauth)?;
    validate_upstream(&config.upstream)?;
    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_server(server: &ServerConfig) -> Result<(), String> {
    if server.public_url.is_empty() {
        return Err("server.public_url is required".to_string());
    }

    if server.public_url.ends_with('/') {
        return Err("server.public_url must not have a trailing slash".to_string());
    }

    // Warn (but allow) http:// for local dev; require https:// otherwise
    if server.public_url.starts_with("http://") {
        tracing::warn!(
            "server.public_url uses http://; the Secure session cookie will not survive plain HTTP"
        );
    } else if !server.public_url.starts_with("https://") {
        return Err(
            "server.public_url must start with https:// (or http:// for local dev)".to_string(),
        );
    }

    if !is_http_url(&server.allowed_origin) || server.allowed_origin.ends_with('/') {
        return Err(
            "server.allowed_origin must be an HTTP(S) origin without a trailing slash".to_string(),
        );
    }

    if !is_http_url(&server.default_redirect) {
        return Err("server.default_redirect must be an HTTP(S) URL".to_string());
    }

    if server.session_ttl_secs == 0 || server.state_max_age_secs == 0 {
        return Err("server.session_ttl_secs and server.state_max_age_secs must be positive".to_string());
    }

    if server.session_ttl_secs > MAX_TTL_SECS || server.state_max_age_secs > MAX_TTL_SECS {
        return Err(format!(
            "server.session_ttl_secs and server.state_max_age_secs must not exceed {MAX_TTL_SECS} (one year)"
        ));
    }

    if server.state_max_age_secs > DAY_SECS {
        tracing::warn!(
            state_max_age_secs = server.state_max_age_secs,
            "Login state parameters stay valid for more than a day"
        );
    }

    if server.cookie_name.is_empty()
        || !server
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("server.cookie_name must be non-empty [A-Za-z0-9_-]".to_string());
    }

    // state_secret must decode to at least 32 bytes
    if server.state_secret.is_empty() {
        return Err("server.state_secret is required".to_string());
    }
    let bytes = server.signing_key()?;
    if bytes.len() < 32 {
        return Err(format!(
            "server.state_secret must be at least 32 bytes when base64-decoded (got {} bytes). Generate with: openssl rand -base64 32",
            bytes.len()
        ));
    }

    Ok(())
}

fn validate_oauth(oauth: &OAuthConfig) -> Result<(), String> {
    let missing: Vec<&str> = [
        ("client_id", oauth.client_id.as_str()),
        ("client_secret", oauth.client_secret.as_str()),
        ("allowed_identity", oauth.allowed_identity.as_str()),
    ]
    .iter()
    .filter(|(_, v)| v.is_empty())
    .map(|(k, _)| *k)
    .collect();

    if !missing.is_empty() {
        return Err(format!("[oauth] requires: {}", missing.join(", ")));
    }

    let identity_regex = regex_lite::Regex::new(r"^[A-Za-z0-9-]+$")
        .map_err(|e| format!("internal regex error: {e}"))?;
    if !identity_regex.is_match(&oauth.allowed_identity) {
        return Err(format!(
            "oauth.allowed_identity '{}' must match ^[A-Za-z0-9-]+$",
            oauth.allowed_identity
        ));
    }

    for (name, url) in [
        ("authorize_url", &oauth.authorize_url),
        ("token_url", &oauth.token_url),
        ("user_url", &oauth.user_url),
    ] {
        if !is_http_url(url) {
            return Err(format!("oauth.{name} must be a valid HTTP(S) URL"));
        }
    }

    Ok(())
}

fn validate_upstream(upstream: &UpstreamConfig) -> Result<(), String> {
    if !is_http_url(&upstream.graphql_url) {
        return Err("upstream.graphql_url must be a valid HTTP(S) URL".to_string());
    }

    if upstream.timeout_secs == 0 {
        return Err("upstream.timeout_secs must be positive".to_string());
    }

    if let Some(path) = upstream.private_paths.iter().find(|p| !p.starts_with('/')) {
        return Err(format!("upstream.private_paths entry '{path}' must start with '/'"));
    }

    // Missing tokens are allowed: the affected tier answers 500 at request time.
    if upstream.public_token.as_deref().is_none_or(str::is_empty) {
        tracing::warn!("upstream.public_token is not set; public GraphQL calls will fail");
    }
    if upstream.private_token.as_deref().is_none_or(str::is_empty) {
        tracing::warn!("upstream.private_token is not set; private GraphQL calls will fail");
    }

    Ok(())
}
