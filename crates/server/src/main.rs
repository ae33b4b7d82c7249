use anyhow::Result;
use axum::{
    routing::{get, post},
    serve, Router,
};
use gateway_core::{config::AppConfig, metrics::MetricsCollector, pipeline::RequestPipeline};
use server::{middleware, router};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,gateway_core=info,server=info"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

fn build_router(config: &AppConfig, state: Arc<router::AppState>) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();

    Router::new()
        .route("/SoapGateway", post(router::handle_gateway))
        .route("/SoapDynamicGateway", post(router::handle_gateway))
        .route("/circuitbreakerfallback", get(router::handle_circuit_breaker_fallback))
        .route("/health", get(router::handle_health))
        .route("/metrics", get(router::handle_metrics))
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(propagate_request_id)
        .layer(set_request_id)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("GATEWAY_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    init_logging(&config);
    info!(
        bind_address = %config.server.bind_address,
        bind_port = config.server.bind_port,
        "starting soap gateway"
    );

    let metrics = Arc::new(MetricsCollector::new());
    let pipeline = Arc::new(
        RequestPipeline::new(&config, Arc::clone(&metrics))
            .map_err(|e| anyhow::anyhow!("pipeline initialization failed: {e}"))?,
    );
    let state = Arc::new(router::AppState { pipeline, metrics });

    let app = build_router(&config, state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.bind_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}
