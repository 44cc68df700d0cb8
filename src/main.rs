use anyhow::{Context, Result};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use cardrelay::api::{create_gateway_router, GatewayState};
use cardrelay::config::GatewayConfig;
use cardrelay::ledger::ActivityLedger;
use cardrelay::session::{run_session_purge, SessionStore};
use cardrelay::webex::WebexClient;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// How often expired sessions are swept, in seconds.
const SESSION_PURGE_INTERVAL: u64 = 600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardrelay=info".into()),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();

    let sessions = Arc::new(
        SessionStore::new(&config.db_path, &config.session_key)
            .context("Failed to open session store")?,
    );
    let ledger =
        Arc::new(ActivityLedger::new(&config.db_path).context("Failed to open activity ledger")?);
    let webex = Arc::new(WebexClient::new(config.webex_base_url.clone()));

    tokio::spawn(run_session_purge(sessions.clone(), SESSION_PURGE_INTERVAL));

    // Cookie-based auth needs credentials, so the CORS origin is pinned to
    // the configured front-end rather than a wildcard.
    let frontend_origin = config
        .frontend_url
        .parse::<HeaderValue>()
        .context("CARDRELAY_FRONTEND_URL is not a valid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    let state = GatewayState {
        config: Arc::new(config),
        webex,
        sessions,
        ledger,
    };
    let app = create_gateway_router(state).layer(cors);

    info!("cardrelay listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
