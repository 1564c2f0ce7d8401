use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use data_agent::{agents::LlmAgentFactory, config::Config, routes::create_router, session::SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "data_agent=debug,tower_http=debug,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        server = ?config.server,
        provider = %config.llm.provider,
        model = %config.llm.model,
        plot_threshold = config.plot.byte_threshold,
        "Configuration loaded"
    );

    // Create shared state
    let state = data_agent::AppState {
        factory: Arc::new(LlmAgentFactory::new(config.llm.clone())),
        sessions: SessionStore::new(),
        config: config.clone(),
    };

    // Drop sessions nobody has touched for a while
    if config.server.session_idle_secs > 0 {
        let max_idle = Duration::from_secs(config.server.session_idle_secs);
        let every = max_idle.min(Duration::from_secs(60));
        state.sessions.spawn_idle_eviction(
            chrono::TimeDelta::from_std(max_idle).context("SESSION_IDLE_SECS is out of range")?,
            every,
        );
    }

    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid HOST/PORT: {}:{}", config.server.host, config.server.port))?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
