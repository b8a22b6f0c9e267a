//! Event Management Service
//!
//! Owns events and their remaining ticket availability. The ticket service
//! reads availability from here and applies the post-booking decrement.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TB_CONFIG` | - | Optional TOML configuration file |
//! | `TB_PORT` | `5001` | HTTP API port |
//! | `TB_METRICS_PORT` | - | Prometheus metrics port (disabled when unset) |
//! | `TB_STORE` | `mongo` | `mongo` or `memory` |
//! | `TB_MONGO_URL` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `TB_MONGO_DB` | `events` | MongoDB database name |
//! | `TB_JWT_SECRET` | - | Shared token signing secret (required) |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use tb_config::{AppConfig, StoreKind};
use tb_platform::api::{event_service_app, AppState, EventsState};
use tb_platform::repository::{EventRepository, InMemoryEventRepository, MongoEventRepository};
use tb_platform::service::{AuthConfig, AuthService};

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_DATABASE: &str = "events";

#[tokio::main]
async fn main() -> Result<()> {
    tb_common::init_logging();
    info!("Starting Event Management Service");

    let config = AppConfig::load()?;
    let auth_service = Arc::new(AuthService::new(AuthConfig::from(&config.auth)));

    let event_repo: Arc<dyn EventRepository> = match config.store.kind {
        StoreKind::Mongo => {
            let db_name = config.database_or(DEFAULT_DATABASE);
            info!("Connecting to MongoDB: {}/{}", config.store.mongo.url, db_name);
            let client = mongodb::Client::with_uri_str(&config.store.mongo.url).await?;
            Arc::new(MongoEventRepository::new(&client.database(db_name)))
        }
        StoreKind::Memory => {
            warn!("Using in-memory event store; data is lost on shutdown");
            Arc::new(InMemoryEventRepository::new())
        }
    };

    if let Some(port) = config.server.metrics_port {
        start_metrics_server(port).await?;
    }

    let app = event_service_app(AppState::new(auth_service), EventsState { event_repo })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("0.0.0.0:{}", config.port_or(DEFAULT_PORT));
    info!("Event service listening on http://{}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Event service shutdown complete");
    Ok(())
}

async fn start_metrics_server(port: u16) -> Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let app = Router::new().route("/metrics", get(move || std::future::ready(handle.render())));

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on http://{}/metrics", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server failed: {}", e);
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
