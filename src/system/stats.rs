//! Host memory and disk usage
//!
//! Every call queries the OS afresh. Nothing is cached between calls and
//! query failures degrade to zeroed figures.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

use super::identity;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

// ─────────────────────────────────────────────────────────────────
// Usage Snapshot
// ─────────────────────────────────────────────────────────────────

/// Capacity and utilization of one resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_gb: f64,
    pub used_gb: f64,
    pub percent: f64,
}

impl UsageStats {
    /// Build from raw byte counts. A zero total yields an all-zero entry.
    pub fn from_bytes(total: u64, used: u64) -> Self {
        if total == 0 {
            return Self::default();
        }

        let used = used.min(total);
        Self {
            total_gb: round_to(total as f64 / BYTES_PER_GB, 2),
            used_gb: round_to(used as f64 / BYTES_PER_GB, 2),
            percent: round_to(used as f64 / total as f64 * 100.0, 1),
        }
    }
}

/// Memory and disk usage at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub ram: UsageStats,
    pub disk: UsageStats,
}

impl SystemSnapshot {
    /// Query the OS for current usage
    pub fn collect() -> Self {
        Self {
            ram: memory_usage(),
            disk: root_disk_usage(),
        }
    }
}

fn memory_usage() -> UsageStats {
    let mut sys = System::new();
    sys.refresh_memory();
    UsageStats::from_bytes(sys.total_memory(), sys.used_memory())
}

/// Usage of the disk mounted at `/`, or the first listed disk when there
/// is no root mount.
fn root_disk_usage() -> UsageStats {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());

    match disk {
        Some(disk) => {
            let total = disk.total_space();
            UsageStats::from_bytes(total, total.saturating_sub(disk.available_space()))
        }
        None => {
            tracing::debug!("No disks reported; disk usage zeroed");
            UsageStats::default()
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ─────────────────────────────────────────────────────────────────
// System Info
// ─────────────────────────────────────────────────────────────────

/// Static host description, printed by the `stats` command and at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub cpu_name: String,
    pub cpu_count: usize,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self {
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            os_name: std::env::consts::OS.to_string(),
            os_version: System::long_os_version().unwrap_or_else(|| identity::UNKNOWN.to_string()),
            arch: std::env::consts::ARCH.to_string(),
            cpu_name: identity::cpu_name().unwrap_or_else(|| identity::UNKNOWN_CPU.to_string()),
            cpu_count: num_cpus::get(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
