//! Ticketing Development Monolith
//!
//! Runs the event, attendee and ticket services in one process against
//! in-memory stores. The ticket service talks to the other two over HTTP on
//! localhost, exactly as it does when deployed separately.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use tb_config::{AppConfig, StoreKind};
use tb_platform::api::{
    attendee_service_app, event_service_app, ticket_service_app, AppState, AttendeesState,
    EventsState, TicketsState,
};
use tb_platform::repository::{
    InMemoryAttendeeRepository, InMemoryBookingRepository, InMemoryEventRepository,
};
use tb_platform::service::{AuthConfig, AuthService};

/// Ticketing Development Server
#[derive(Parser, Debug)]
#[command(name = "tb-dev")]
#[command(about = "Ticketing Development Monolith - all services in one binary")]
struct Args {
    /// Event service port
    #[arg(long, env = "TB_EVENT_PORT", default_value = "5001")]
    event_port: u16,

    /// Attendee service port
    #[arg(long, env = "TB_ATTENDEE_PORT", default_value = "5002")]
    attendee_port: u16,

    /// Ticket service port
    #[arg(long, env = "TB_TICKET_PORT", default_value = "5003")]
    ticket_port: u16,

    /// Metrics server port (disabled when unset)
    #[arg(long, env = "TB_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Shared token signing secret
    #[arg(long, env = "TB_JWT_SECRET", default_value = "dev-secret-change-me")]
    jwt_secret: String,

    /// Partial failure policy: report or compensate
    #[arg(long, env = "TB_COMPENSATION", default_value = "report")]
    compensation: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tb_common::init_logging();
    let args = Args::parse();

    info!("Starting Ticketing Dev Monolith");
    info!(
        "Ports: events={}, attendees={}, tickets={}, metrics={:?}",
        args.event_port, args.attendee_port, args.ticket_port, args.metrics_port
    );

    let config = dev_config(&args)?;
    let auth_service = Arc::new(AuthService::new(AuthConfig::from(&config.auth)));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let events_app = event_service_app(
        AppState::new(auth_service.clone()),
        EventsState { event_repo: Arc::new(InMemoryEventRepository::new()) },
    );
    let attendees_app = attendee_service_app(
        AppState::new(auth_service.clone()),
        AttendeesState { attendee_repo: Arc::new(InMemoryAttendeeRepository::new()) },
    );
    let tickets = TicketsState::from_config(
        &config,
        auth_service.clone(),
        Arc::new(InMemoryBookingRepository::new()),
    )?;
    let tickets_app = ticket_service_app(AppState::new(auth_service), tickets);

    let mut handles = vec![
        spawn_server("Event service", args.event_port, with_layers(events_app), &shutdown_tx).await?,
        spawn_server("Attendee service", args.attendee_port, with_layers(attendees_app), &shutdown_tx).await?,
        spawn_server("Ticket service", args.ticket_port, with_layers(tickets_app), &shutdown_tx).await?,
    ];
    if let Some(port) = args.metrics_port {
        let handle = PrometheusBuilder::new().install_recorder()?;
        let metrics_app = Router::new().route("/metrics", get(move || std::future::ready(handle.render())));
        handles.push(spawn_server("Metrics server", port, metrics_app, &shutdown_tx).await?);
    }

    info!("Ticketing Dev Monolith started successfully");
    info!("Press Ctrl+C to shutdown");

    shutdown_signal().await;
    info!("Shutdown signal received, initiating graceful shutdown...");
    let _ = shutdown_tx.send(());

    let _ = tokio::time::timeout(Duration::from_secs(30), async {
        for handle in handles {
            let _ = handle.await;
        }
    })
    .await;

    info!("Ticketing Dev Monolith shutdown complete");
    Ok(())
}

/// Defaults plus environment, with the command line taking precedence
fn dev_config(args: &Args) -> Result<AppConfig> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    env.insert("TB_JWT_SECRET".to_string(), args.jwt_secret.clone());
    env.insert("TB_COMPENSATION".to_string(), args.compensation.clone());
    env.insert(
        "TB_EVENT_SERVICE_URL".to_string(),
        format!("http://127.0.0.1:{}", args.event_port),
    );
    env.insert(
        "TB_ATTENDEE_SERVICE_URL".to_string(),
        format!("http://127.0.0.1:{}", args.attendee_port),
    );

    let mut config = AppConfig::default();
    config.apply_env(&env)?;
    config.store.kind = StoreKind::Memory;
    config.validate()?;
    Ok(config)
}

fn with_layers(app: Router) -> Router {
    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn spawn_server(
    name: &'static str,
    port: u16,
    app: Router,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<JoinHandle<()>> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("{} listening on http://{}", name, addr);

    let mut shutdown_rx = shutdown_tx.subscribe();
    Ok(tokio::spawn(async move {
        let server = axum::serve(listener, app);
        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("{} error: {}", name, e);
                }
            }
            _ = shutdown_rx.recv() => {
                info!("{} shutting down", name);
            }
        }
    }))
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
}
