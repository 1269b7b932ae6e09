//! CUDA device
//!
//! Kernels are enqueued on the device stream and return immediately;
//! callers must `synchronize` before reading a clock.

use crate::error::{Error, Result};
use crate::system::identity;

use super::{check_device_budget, ComputeDevice, DeviceKind, MatrixPair};

/// NVIDIA accelerator backed by candle's CUDA runtime
pub struct CudaDevice {
    device: candle_core::Device,
    ordinal: usize,
    /// Adapter memory, when the adapter could be matched
    device_bytes: Option<u64>,
}

impl CudaDevice {
    /// Open the device at `ordinal`, failing if no CUDA runtime is usable
    pub fn open(ordinal: usize) -> Result<Self> {
        if !candle_core::utils::cuda_is_available() {
            return Err(Error::DeviceUnavailable {
                device: DeviceKind::Cuda,
                message: "CUDA runtime not available".to_string(),
            });
        }

        let device = candle_core::Device::new_cuda(ordinal).map_err(|e| Error::DeviceUnavailable {
            device: DeviceKind::Cuda,
            message: format!("failed to open device {}: {}", ordinal, e),
        })?;

        let device_bytes = identity::accelerator_adapter(ordinal)
            .map(|adapter| adapter.total_memory_mb.saturating_mul(1024 * 1024));

        tracing::info!(ordinal, memory_bytes = ?device_bytes, "CUDA device opened");

        Ok(Self {
            device,
            ordinal,
            device_bytes,
        })
    }
}

impl ComputeDevice for CudaDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Cuda
    }

    fn name(&self) -> String {
        identity::accelerator_name(self.ordinal).unwrap_or_else(|| identity::UNKNOWN.to_string())
    }

    fn allocate(&self, dimension: usize) -> Result<MatrixPair> {
        check_device_budget(DeviceKind::Cuda, dimension, self.device_bytes)?;
        let operands = MatrixPair::standard_normal(&self.device, DeviceKind::Cuda, dimension)?;
        // Out-of-memory from the random fill can surface at the next barrier
        self.device
            .synchronize()
            .map_err(|e| Error::allocation_failed(DeviceKind::Cuda, dimension, e.to_string()))?;
        Ok(operands)
    }

    fn multiply(&self, operands: &MatrixPair) -> Result<()> {
        // Dropping the product only frees it once the stream reaches it
        let _product = operands.multiply(DeviceKind::Cuda)?;
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.device
            .synchronize()
            .map_err(|source| Error::Kernel { device: DeviceKind::Cuda, source })
    }
}
