//! HTTP API
//!
//! Endpoints:
//! - `GET  /system-stats`  memory and disk usage
//! - `POST /run-benchmark` CPU versus accelerator matmul timing
//! - `POST /stress-test`   sustained full load on one device (heats the hardware)
//! - `GET  /health`        liveness and version
//! - `GET  /devices`       enumerated compute devices

mod error;
mod handlers;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::backend::DeviceRegistry;
use crate::config::DiagConfig;
use crate::error::{Error, Result};
use crate::system::{BenchmarkRunner, StressRunner};

// ─────────────────────────────────────────────────────────────────
// Application State
// ─────────────────────────────────────────────────────────────────

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    registry: Arc<DeviceRegistry>,
    benchmark: Arc<BenchmarkRunner>,
    stress: Arc<StressRunner>,
    default_size: i64,
    default_duration: i64,
}

impl AppState {
    pub fn new(config: &DiagConfig, registry: Arc<DeviceRegistry>) -> Self {
        Self {
            benchmark: Arc::new(BenchmarkRunner::new(Arc::clone(&registry))),
            stress: Arc::new(StressRunner::new(Arc::clone(&registry), config.stress.clone())),
            registry,
            default_size: config.benchmark.default_size,
            default_duration: config.stress.default_duration_secs,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────

/// Build the router with CORS limited to `cors_origin`
pub fn router(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = HeaderValue::from_str(cors_origin).map_err(|e| {
        Error::config_field_invalid("server.cors_origin", format!("'{}' is not a valid origin: {}", cors_origin, e))
    })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/system-stats", get(handlers::system_stats))
        .route("/run-benchmark", post(handlers::run_benchmark))
        .route("/stress-test", post(handlers::stress_test))
        .route("/health", get(handlers::health))
        .route("/devices", get(handlers::devices))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Bind, serve until Ctrl+C, then drain in-flight requests
pub async fn serve(config: &DiagConfig, registry: Arc<DeviceRegistry>) -> Result<()> {
    let app = router(AppState::new(config, registry), &config.server.cors_origin)?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::ServerBind { addr: addr.clone(), source })?;

    info!(
        addr = %addr,
        cors_origin = %config.server.cors_origin,
        "hwdiag API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Could not install Ctrl+C handler; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
