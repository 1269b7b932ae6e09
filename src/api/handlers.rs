//! Route handlers
//!
//! Every workload runs on the blocking pool via the runners; handlers
//! only translate requests and responses.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::backend::DeviceDescriptor;
use crate::error::Error;
use crate::system::{BenchmarkReport, StressReport, SystemSnapshot};
use crate::version::build_info;

use super::error::ApiError;
use super::AppState;

// ─────────────────────────────────────────────────────────────────
// Request / Response Types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct BenchmarkRequest {
    /// Square matrix dimension; configured default when omitted
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StressRequest {
    /// Seconds to run; configured default when omitted
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
}

// ─────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────

pub async fn system_stats() -> Result<Json<SystemSnapshot>, ApiError> {
    let snapshot = tokio::task::spawn_blocking(SystemSnapshot::collect)
        .await
        .map_err(|e| Error::Internal(format!("stats task aborted: {}", e)))?;
    Ok(Json(snapshot))
}

pub async fn run_benchmark(
    State(state): State<AppState>,
    Json(request): Json<BenchmarkRequest>,
) -> Json<BenchmarkReport> {
    let size = request.size.unwrap_or(state.default_size);
    Json(state.benchmark.run(size).await)
}

pub async fn stress_test(
    State(state): State<AppState>,
    Json(request): Json<StressRequest>,
) -> Result<Json<StressReport>, ApiError> {
    let duration = request.duration.unwrap_or(state.default_duration);
    let report = state.stress.run(duration).await?;
    Ok(Json(report))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: build_info().full_version(),
    })
}

pub async fn devices(State(state): State<AppState>) -> Result<Json<Vec<DeviceDescriptor>>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let listing = tokio::task::spawn_blocking(move || {
        registry.refresh();
        registry.describe()
    })
    .await
    .map_err(|e| Error::Internal(format!("device listing aborted: {}", e)))?;
    Ok(Json(listing))
}
