mod auth;
mod config;
mod error;
mod oauth;
mod proxy;
mod routes;
mod state;

use clap::Parser;
use std::path::PathBuf;

/// GraphQL edge gateway. Single-identity OAuth login, signed session
/// cookies and a two-credential proxy in front of a GraphQL API.
#[derive(Parser, Debug)]
#[command(name = "graphql-edge-gateway", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = match config::load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // CLI --port overrides config
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    tracing::info!(
        allowed_origin = %cfg.server.allowed_origin,
        allowed_identity = %cfg.oauth.allowed_identity,
        graphql_url = %cfg.upstream.graphql_url,
        public_token = cfg.upstream.public_token.is_some(),
        private_token = cfg.upstream.private_token.is_some(),
        "Configuration loaded successfully"
    );

    let bind_addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let public_url = cfg.server.public_url.clone();

    let state = match state::AppState::new(cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Startup error: {e}");
            std::process::exit(1);
        }
    };

    let app = routes::router(state);

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("Public URL: {public_url}");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to {bind_addr}: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
