//! CPU device
//!
//! The baseline synchronous device. Candle's CPU kernels complete
//! before `matmul` returns, so no barrier is needed around the timer.

use sysinfo::System;

use crate::error::{Error, Result};
use crate::system::identity;

use super::{operand_bytes, ComputeDevice, DeviceKind, MatrixPair};

const BYTES_PER_MB: u64 = 1024 * 1024;

// ─────────────────────────────────────────────────────────────────
// Memory Budget
// ─────────────────────────────────────────────────────────────────

/// Host memory needed to multiply two `dimension x dimension` f32 matrices.
///
/// Saturates instead of overflowing for absurd dimensions.
pub fn required_bytes(dimension: usize) -> u64 {
    operand_bytes(dimension).unwrap_or(u64::MAX)
}

fn available_bytes() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory()
}

// ─────────────────────────────────────────────────────────────────
// CPU Device
// ─────────────────────────────────────────────────────────────────

/// Host CPU compute device
pub struct CpuDevice {
    device: candle_core::Device,
    /// Fixed budget in bytes; `None` reads available memory on every allocate
    memory_limit: Option<u64>,
}

impl CpuDevice {
    pub fn new() -> Self {
        tracing::debug!(threads = num_cpus::get(), "Initializing CPU device");

        Self {
            device: candle_core::Device::Cpu,
            memory_limit: None,
        }
    }

    /// Use a fixed memory budget instead of the live available figure
    #[cfg(test)]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    fn check_budget(&self, dimension: usize) -> Result<()> {
        let required = required_bytes(dimension);
        let available = self.memory_limit.unwrap_or_else(available_bytes);

        if required > available {
            tracing::warn!(
                dimension,
                required_mb = required / BYTES_PER_MB,
                available_mb = available / BYTES_PER_MB,
                "CPU allocation exceeds memory budget"
            );
            return Err(Error::memory_limit(
                required / BYTES_PER_MB,
                available / BYTES_PER_MB,
            ));
        }

        Ok(())
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDevice for CpuDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    fn name(&self) -> String {
        identity::cpu_name().unwrap_or_else(|| identity::UNKNOWN_CPU.to_string())
    }

    fn allocate(&self, dimension: usize) -> Result<MatrixPair> {
        self.check_budget(dimension)?;
        MatrixPair::standard_normal(&self.device, DeviceKind::Cpu, dimension)
    }

    fn multiply(&self, operands: &MatrixPair) -> Result<()> {
        let product = operands.multiply(DeviceKind::Cpu)?;
        std::hint::black_box(product);
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.device
            .synchronize()
            .map_err(|source| Error::Kernel { device: DeviceKind::Cpu, source })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
