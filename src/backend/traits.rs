//! Compute device trait definitions
//!
//! Every device the workload controller can target implements
//! [`ComputeDevice`]. The runners only ever see this interface, so a
//! synchronous CPU and an asynchronous-dispatch accelerator are measured
//! by the same code path.

use std::sync::Arc;

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Device Kind
// ─────────────────────────────────────────────────────────────────

/// Closed set of device kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Baseline synchronous device
    Cpu,
    /// NVIDIA accelerator with an asynchronous work queue
    Cuda,
}

impl DeviceKind {
    /// Identifier used in reports and JSON keys
    pub fn name(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Cuda => "cuda",
        }
    }

    /// Short label used in human-readable summaries
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "CPU",
            DeviceKind::Cuda => "GPU",
        }
    }

    /// Whether dispatch returns before the work is done.
    ///
    /// Timing reads on such a device are only valid after a synchronize.
    pub fn is_async(&self) -> bool {
        matches!(self, DeviceKind::Cuda)
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Operands
// ─────────────────────────────────────────────────────────────────

/// Bytes per f32 element
const ELEMENT_BYTES: u64 = 4;

/// Both operands plus the product
const RESIDENT_MATRICES: u64 = 3;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Memory needed to multiply two `dimension x dimension` f32 matrices,
/// or `None` if the figure does not fit in a `u64`.
pub fn operand_bytes(dimension: usize) -> Option<u64> {
    let dimension = u64::try_from(dimension).ok()?;
    dimension
        .checked_mul(dimension)?
        .checked_mul(ELEMENT_BYTES * RESIDENT_MATRICES)
}

/// Reject an allocation that cannot fit before the device runtime sees it.
///
/// `device_bytes` is the device's memory when known; an unknown size only
/// guards against overflow.
#[cfg_attr(not(feature = "cuda"), allow(dead_code))]
pub fn check_device_budget(kind: DeviceKind, dimension: usize, device_bytes: Option<u64>) -> Result<()> {
    let Some(required) = operand_bytes(dimension) else {
        return Err(Error::allocation_failed(kind, dimension, "matrix size overflows"));
    };

    match device_bytes {
        Some(limit) if required > limit => Err(Error::allocation_failed(
            kind,
            dimension,
            format!(
                "needs {}MB, device has {}MB",
                required / BYTES_PER_MB,
                limit / BYTES_PER_MB
            ),
        )),
        _ => Ok(()),
    }
}

/// Two square operands resident on one device
#[derive(Debug)]
pub struct MatrixPair {
    dimension: usize,
    lhs: Tensor,
    rhs: Tensor,
}

impl MatrixPair {
    /// Draw two `dimension x dimension` standard-normal f32 matrices
    pub fn standard_normal(
        device: &candle_core::Device,
        kind: DeviceKind,
        dimension: usize,
    ) -> Result<Self> {
        let draw = || Tensor::randn(0f32, 1f32, (dimension, dimension), device);
        let lhs = draw().map_err(|e| Error::allocation_failed(kind, dimension, e.to_string()))?;
        let rhs = draw().map_err(|e| Error::allocation_failed(kind, dimension, e.to_string()))?;
        Ok(Self { dimension, lhs, rhs })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Issue `lhs x rhs`. On an asynchronous device this only enqueues the work.
    pub fn multiply(&self, kind: DeviceKind) -> Result<Tensor> {
        self.lhs
            .matmul(&self.rhs)
            .map_err(|source| Error::Kernel { device: kind, source })
    }
}

// ─────────────────────────────────────────────────────────────────
// ComputeDevice Trait
// ─────────────────────────────────────────────────────────────────

/// Uniform capability interface over compute devices
///
/// Implementations own their runtime handle; nothing here touches
/// process-global device state.
pub trait ComputeDevice: Send + Sync {
    /// Which kind of device this is
    fn kind(&self) -> DeviceKind;

    /// Human-readable device name, "Unknown" when it cannot be resolved
    fn name(&self) -> String;

    /// Whether timing requires a synchronize barrier
    fn is_async(&self) -> bool {
        self.kind().is_async()
    }

    /// Place two random operands of the given dimension on the device
    fn allocate(&self, dimension: usize) -> Result<MatrixPair>;

    /// Issue one matrix multiply
    fn multiply(&self, operands: &MatrixPair) -> Result<()>;

    /// Block until all previously issued work has completed
    fn synchronize(&self) -> Result<()>;

    /// Serializable summary for listings
    fn describe(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            id: self.kind(),
            name: self.name(),
            asynchronous: self.is_async(),
        }
    }
}

/// Type alias for a shared device reference
pub type SharedDevice = Arc<dyn ComputeDevice>;

/// Device listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: DeviceKind,
    pub name: String,
    pub asynchronous: bool,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_names() {
        assert_eq!(DeviceKind::Cpu.name(), "cpu");
        assert_eq!(DeviceKind::Cuda.name(), "cuda");
        assert_eq!(DeviceKind::Cuda.label(), "GPU");
        assert_eq!(DeviceKind::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_only_accelerator_is_async() {
        assert!(!DeviceKind::Cpu.is_async());
        assert!(DeviceKind::Cuda.is_async());
    }

    #[test]
    fn test_device_kind_serde() {
        assert_eq!(serde_json::to_string(&DeviceKind::Cuda).unwrap(), "\"cuda\"");
        let kind: DeviceKind = serde_json::from_str("\"cpu\"").unwrap();
        assert_eq!(kind, DeviceKind::Cpu);
    }

    #[test]
    fn test_operand_bytes() {
        assert_eq!(operand_bytes(0), Some(0));
        assert_eq!(operand_bytes(10), Some(1200));
        assert_eq!(operand_bytes(usize::MAX), None);
    }

    #[test]
    fn test_device_budget_rejects_overflow() {
        let err = check_device_budget(DeviceKind::Cuda, usize::MAX, None).unwrap_err();
        assert!(err.is_allocation_failure());
        assert!(matches!(err, Error::AllocationFailed { device: DeviceKind::Cuda, .. }));
    }

    #[test]
    fn test_device_budget_against_known_memory() {
        let eight_gb = 8 * 1024 * 1024 * 1024;
        // 40000^2 * 4 bytes * 3 matrices is about 17.9GB
        let err = check_device_budget(DeviceKind::Cuda, 40_000, Some(eight_gb)).unwrap_err();
        assert!(err.to_string().contains("device has 8192MB"));

        assert!(check_device_budget(DeviceKind::Cuda, 10_000, Some(eight_gb)).is_ok());
        assert!(check_device_budget(DeviceKind::Cuda, 40_000, None).is_ok());
    }

    #[test]
    fn test_standard_normal_pair_multiplies() {
        let pair = MatrixPair::standard_normal(&candle_core::Device::Cpu, DeviceKind::Cpu, 8).unwrap();
        assert_eq!(pair.dimension(), 8);

        let product = pair.multiply(DeviceKind::Cpu).unwrap();
        assert_eq!(product.dims(), &[8, 8]);
    }
}
