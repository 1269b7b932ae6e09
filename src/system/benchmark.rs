//! CPU versus accelerator matmul benchmark
//!
//! Runs the timed kernel once on every enumerated device at the same
//! dimension, keeps every result (a failing device never aborts the
//! others) and summarizes the relative speed.

use std::path::Path;
use std::sync::Arc;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{DeviceKind, DeviceRegistry};
use crate::error::{Error, Result};

use super::identity;
use super::kernel::{self, WorkloadSpec};

/// Wire value for a device whose kernel failed
pub const FAILURE_SENTINEL: i64 = -1;

// ─────────────────────────────────────────────────────────────────
// Benchmark Results
// ─────────────────────────────────────────────────────────────────

/// Outcome of the kernel on one device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceTiming {
    /// Elapsed seconds for one multiply
    Completed(f64),
    /// The kernel raised on this device
    Failed(String),
}

impl DeviceTiming {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            DeviceTiming::Completed(secs) => Some(*secs),
            DeviceTiming::Failed(_) => None,
        }
    }
}

/// Timing for one device
#[derive(Debug, Clone)]
pub struct DeviceMeasurement {
    pub device: DeviceKind,
    pub timing: DeviceTiming,
}

/// Complete benchmark results
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Dimension exactly as requested
    pub dimension: i64,
    pub cpu_name: String,
    /// Present whenever an accelerator was enumerated
    pub gpu_name: Option<String>,
    /// One entry per enumerated device, baseline first
    pub measurements: Vec<DeviceMeasurement>,
    pub speedup: Option<f64>,
    pub summary: String,
}

impl BenchmarkReport {
    /// Write the report as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;

        std::fs::write(path, json).map_err(|e| Error::IoWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(path = %path.display(), "Benchmark report saved");
        Ok(())
    }
}

/// Flat wire shape: each device id is a key holding seconds or -1
impl Serialize for BenchmarkReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("cpu_name", &self.cpu_name)?;
        if let Some(ref gpu_name) = self.gpu_name {
            map.serialize_entry("gpu_name", gpu_name)?;
        }
        for m in &self.measurements {
            match m.timing {
                DeviceTiming::Completed(secs) => map.serialize_entry(m.device.name(), &secs)?,
                DeviceTiming::Failed(_) => map.serialize_entry(m.device.name(), &FAILURE_SENTINEL)?,
            }
        }
        if let Some(speedup) = self.speedup {
            map.serialize_entry("speedup", &speedup)?;
        }
        map.serialize_entry("summary", &self.summary)?;
        map.serialize_entry("size", &self.dimension)?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.end()
    }
}

// ─────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────

/// Speedup and headline for a set of measurements.
///
/// A ratio is only formed from two successful timings with a positive
/// accelerator time.
pub fn summarize(measurements: &[DeviceMeasurement]) -> (Option<f64>, String) {
    let accelerator = measurements.iter().find(|m| m.device.is_async());
    let baseline = measurements.iter().find(|m| m.device == DeviceKind::Cpu);

    let Some(accelerator) = accelerator else {
        return (None, "GPU unavailable".to_string());
    };
    let label = accelerator.device.label();

    let Some(accel_secs) = accelerator.timing.seconds() else {
        return (None, format!("{} unavailable", label));
    };
    let Some(base_secs) = baseline.and_then(|b| b.timing.seconds()) else {
        return (None, "CPU baseline unavailable".to_string());
    };

    if accel_secs <= 0.0 {
        return (None, format!("{} time below timer resolution", label));
    }

    let speedup = base_secs / accel_secs;
    (Some(speedup), format!("{} is {:.1}x faster", label, speedup))
}

// ─────────────────────────────────────────────────────────────────
// Benchmark Runner
// ─────────────────────────────────────────────────────────────────

/// Runs the benchmark across every registered device
pub struct BenchmarkRunner {
    registry: Arc<DeviceRegistry>,
    cpu_name: fn() -> Option<String>,
}

impl BenchmarkRunner {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self {
            registry,
            cpu_name: identity::cpu_name,
        }
    }

    #[cfg(test)]
    fn with_cpu_name(mut self, resolver: fn() -> Option<String>) -> Self {
        self.cpu_name = resolver;
        self
    }

    /// Measure every device in order. Never fails: per-device errors are
    /// recorded in the report.
    pub async fn run(&self, dimension: i64) -> BenchmarkReport {
        self.registry.refresh_async().await;
        let slots = self.registry.slots();

        info!(
            dimension,
            devices = ?slots.iter().map(|s| s.kind()).collect::<Vec<_>>(),
            "Starting benchmark"
        );

        let cpu_name = match tokio::task::spawn_blocking(self.cpu_name).await {
            Ok(Some(name)) => name,
            Ok(None) => identity::UNKNOWN_CPU.to_string(),
            Err(e) => {
                warn!(error = %e, "CPU name lookup aborted");
                identity::UNKNOWN_CPU.to_string()
            }
        };

        let mut gpu_name = None;
        let mut measurements = Vec::with_capacity(slots.len());

        for slot in slots {
            let kind = slot.kind();
            let permit = slot.acquire().await;
            let device = Arc::clone(slot.device());
            let spec = WorkloadSpec::new(dimension);

            let outcome = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let name = device.is_async().then(|| device.name());
                (name, kernel::run(device.as_ref(), &spec))
            })
            .await;

            let timing = match outcome {
                Ok((name, result)) => {
                    if name.is_some() {
                        gpu_name = name;
                    }
                    match result {
                        Ok(secs) => DeviceTiming::Completed(secs),
                        Err(e) => {
                            warn!(device = %kind, error = %e.format_for_log(), "Kernel failed");
                            DeviceTiming::Failed(e.to_string())
                        }
                    }
                }
                Err(e) => {
                    warn!(device = %kind, error = %e, "Kernel task aborted");
                    DeviceTiming::Failed(format!("kernel task aborted: {}", e))
                }
            };

            measurements.push(DeviceMeasurement { device: kind, timing });
        }

        let (speedup, summary) = summarize(&measurements);

        info!(summary = %summary, speedup = ?speedup, "Benchmark complete");

        BenchmarkReport {
            timestamp: chrono::Utc::now(),
            dimension,
            cpu_name,
            gpu_name,
            measurements,
            speedup,
            summary,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
