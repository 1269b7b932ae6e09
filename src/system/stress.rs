//! Sustained-load stress test
//!
//! Keeps one device saturated with back-to-back multiplies until a
//! wall-clock deadline. This drives the hardware to full power and
//! temperature for the whole run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{ComputeDevice, DeviceKind, DeviceRegistry, MatrixPair};
use crate::config::{StressSettings, STRESS_DURATION_CAP_SECS};
use crate::error::{Error, Result};

use super::kernel;

/// Status reported for every run that reaches its deadline
pub const STATUS_COMPLETED: &str = "Completed";

// ─────────────────────────────────────────────────────────────────
// Stress Report
// ─────────────────────────────────────────────────────────────────

/// Outcome of one stress run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub status: String,
    pub device: DeviceKind,
    /// Requested duration after clamping
    pub duration_requested: i64,
    /// Seconds actually spent in the loop, 2 decimals
    pub duration_actual: f64,
    pub matrix_operations: u64,
    /// Dimension actually used, primary or fallback
    pub dimension: usize,
}

// ─────────────────────────────────────────────────────────────────
// Stress Runner
// ─────────────────────────────────────────────────────────────────

/// Runs bounded stress tests on the preferred device
pub struct StressRunner {
    registry: Arc<DeviceRegistry>,
    settings: StressSettings,
}

impl StressRunner {
    pub fn new(registry: Arc<DeviceRegistry>, settings: StressSettings) -> Self {
        Self { registry, settings }
    }

    /// Upper bound only; zero and negative durations pass through.
    ///
    /// The configured maximum can lower the hard cap but never raise it.
    pub fn clamp_duration(&self, requested: i64) -> i64 {
        requested
            .min(self.settings.max_duration_secs)
            .min(STRESS_DURATION_CAP_SECS)
    }

    /// Stress the accelerator if present, otherwise the baseline.
    ///
    /// Holds the device's permit for the whole run.
    pub async fn run(&self, requested: i64) -> Result<StressReport> {
        let duration = self.clamp_duration(requested);
        self.registry.refresh_async().await;
        let slot = self
            .registry
            .preferred()
            .ok_or_else(|| Error::Internal("no compute device registered".to_string()))?;

        let permit = slot.acquire().await;
        let device = Arc::clone(slot.device());
        let primary = self.settings.primary_dimension;
        let fallback = self.settings.fallback_dimension;

        warn!(
            device = %device.kind(),
            duration_secs = duration,
            requested_secs = requested,
            "Starting stress test: device will run at full load"
        );

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            stress(device.as_ref(), duration, primary, fallback)
        })
        .await
        .map_err(|e| Error::Internal(format!("stress task aborted: {}", e)))?
    }
}

/// Blocking body of a stress run
fn stress(device: &dyn ComputeDevice, duration: i64, primary: usize, fallback: usize) -> Result<StressReport> {
    let operands = allocate_with_fallback(device, primary, fallback)?;
    let dimension = operands.dimension();

    let start = Instant::now();
    let deadline = deadline_after(start, duration)?;
    let mut iterations: u64 = 0;

    while Instant::now() < deadline {
        kernel::execute(device, &operands)?;
        iterations += 1;
    }

    let elapsed = start.elapsed().as_secs_f64();
    let report = StressReport {
        status: STATUS_COMPLETED.to_string(),
        device: device.kind(),
        duration_requested: duration,
        duration_actual: (elapsed * 100.0).round() / 100.0,
        matrix_operations: iterations,
        dimension,
    };

    info!(
        device = %report.device,
        dimension,
        iterations,
        elapsed_secs = report.duration_actual,
        "Stress test complete"
    );

    Ok(report)
}

/// `start + duration` seconds; non-positive durations give `start`
fn deadline_after(start: Instant, duration: i64) -> Result<Instant> {
    let window = Duration::from_secs(u64::try_from(duration).unwrap_or(0));
    start
        .checked_add(window)
        .ok_or_else(|| Error::Internal(format!("stress deadline of {}s is out of range", duration)))
}

/// Allocate at `primary`; on an allocation failure retry exactly once at
/// `fallback`.
fn allocate_with_fallback(device: &dyn ComputeDevice, primary: usize, fallback: usize) -> Result<MatrixPair> {
    match device.allocate(primary) {
        Ok(operands) => Ok(operands),
        Err(e) if e.is_allocation_failure() => {
            warn!(
                device = %device.kind(),
                primary,
                fallback,
                error = %e,
                "Primary allocation failed, retrying at fallback dimension"
            );
            device.allocate(fallback).map_err(|e| Error::StressAllocation {
                device: device.kind(),
                primary,
                fallback,
                message: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
