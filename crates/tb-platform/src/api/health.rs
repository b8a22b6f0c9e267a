//! Health endpoint

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn health_router(service: &'static str) -> Router {
    Router::new().route(
        "/health",
        get(move || async move {
            Json::<Value>(json!({
                "status": "UP",
                "service": service,
                "version": env!("CARGO_PKG_VERSION")
            }))
        }),
    )
}
