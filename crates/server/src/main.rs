//! Conversation engine server entry point (§6, C13).
//!
//! Grounded on the teacher's `main.rs`: load layered config, init tracing,
//! build the stateful pieces the engine needs, bind, and serve with
//! graceful shutdown on Ctrl+C/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use pregnancy_agent::{CircuitBreaker, ConversationEngine, EngineConfig as AgentEngineConfig, MemoryStore, RateLimiter};
use pregnancy_config::{load_settings, Settings};
use pregnancy_llm::LlmClient;
use pregnancy_persistence::{InMemoryRepository, Repository};
use pregnancy_server::{create_router, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("PREGNANCY_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            eprintln!("Loaded configuration (env: {})", env.as_deref().unwrap_or("default"));
            settings
        }
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting pregnancy-agent server");

    let metrics_handle = Arc::new(
        metrics::init_metrics().map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {e}"))?,
    );
    tracing::info!("initialized Prometheus metrics at /metrics");

    let repo: Arc<dyn Repository> = if config.persistence.enabled {
        tracing::info!(hosts = ?config.persistence.scylla_hosts, keyspace = %config.persistence.keyspace, "connecting to ScyllaDB");
        match pregnancy_persistence::connect(&config.persistence).await {
            Ok(repo) => Arc::new(repo),
            Err(e) => {
                tracing::error!(error = %e, "failed to connect to ScyllaDB, falling back to in-memory repository");
                Arc::new(InMemoryRepository::new())
            }
        }
    } else {
        tracing::info!("persistence disabled, using in-memory repository");
        Arc::new(InMemoryRepository::new())
    };

    let llm = Arc::new(LlmClient::new(&config.llm.base_url, &config.llm.api_key, &config.llm.model)?);

    let memory = Arc::new(MemoryStore::new(config.engine.short_term_window, config.engine.session_reset_idle()));
    let circuit = Arc::new(CircuitBreaker::new(config.engine.circuit_failure_threshold, config.engine.circuit_cooldown()));
    let rate_limiter = Arc::new(RateLimiter::new(config.engine.rate_limit));
    let _sweeper = rate_limiter.clone().spawn_sweeper();

    let engine_config = AgentEngineConfig {
        ai_timeout: config.engine.ai_timeout(),
        temperature: config.engine.temperature,
        max_tokens: config.engine.max_tokens,
    };
    let engine = Arc::new(ConversationEngine::new(repo, llm, memory, circuit, engine_config));

    let settings = Arc::new(config.clone());
    let state = AppState::new(engine, rate_limiter, settings, metrics_handle);

    let app = create_router(state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>().unwrap_or_else(|_| [0, 0, 0, 0].into()),
        config.server.port,
    ));
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pregnancy_agent=info,pregnancy_server=info,tower_http=debug".into());

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let json = std::env::var("PREGNANCY_LOG_JSON").map(|v| v == "1").unwrap_or(false);
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
