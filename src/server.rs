use anyhow::Result;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Config,
    handlers::{self, AppState},
    metrics,
    render::{Renderer, ViewRenderer},
    signals::setup_signal_handlers,
    snowflake::{IdGenerator, Snowflake},
};

/// Start the web server
///
/// This function:
/// 1. Initializes metrics
/// 2. Builds the identifier generator and view renderer
/// 3. Sets up signal handlers for graceful shutdown and view reload
/// 4. Binds to the configured address
/// 5. Serves requests with graceful shutdown support
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics()?);

    let ids: Arc<dyn IdGenerator> = Arc::new(Snowflake::new(config.ids.worker_id, config.ids.epoch_ms)?);
    let renderer: Arc<dyn Renderer> = Arc::new(ViewRenderer::from_config(&config.views));

    let (shutdown_tx, signal_handle) = setup_signal_handlers(renderer.clone());
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app_state = AppState::new(ids, renderer, &config);
    let app = create_router(app_state, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting webserver on {}", addr);
    info!(
        "Configuration: worker id {}, views from {} (*.{}, cache {})",
        config.ids.worker_id,
        config.views.dir.display(),
        config.views.extension,
        if config.views.cache { "on" } else { "off" },
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(app_state: AppState, metrics_handle: Arc<PrometheusHandle>) -> Router {
    let body_limit = app_state.body_limit;

    let pages = Router::new()
        .route("/", get(handlers::pages::index))
        .route("/hello/:name", get(handlers::pages::hello))
        .with_state(app_state);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics_handler::metrics))
        .with_state(metrics_handle)
        .merge(pages)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
