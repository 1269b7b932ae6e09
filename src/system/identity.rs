//! Human-readable hardware names
//!
//! Best effort only: `None` means the name could not be resolved and the
//! caller substitutes a placeholder.

use sysinfo::System;

use crate::gpu::{self, GpuInfo};

/// Placeholder when the CPU brand string is unavailable
pub const UNKNOWN_CPU: &str = "Unknown CPU";

/// Placeholder for any other unresolved name
pub const UNKNOWN: &str = "Unknown";

/// CPU brand string, e.g. "AMD Ryzen 9 7950X 16-Core Processor"
pub fn cpu_name() -> Option<String> {
    let mut sys = System::new();
    sys.refresh_cpu_all();

    sys.cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
}

/// Adapter backing CUDA device `ordinal`
pub fn accelerator_adapter(ordinal: usize) -> Option<GpuInfo> {
    match gpu::detect_gpus() {
        Ok(gpus) => gpu::select_cuda_adapter(&gpus, ordinal).cloned(),
        Err(e) => {
            tracing::debug!(error = %e, "Accelerator adapter lookup failed");
            None
        }
    }
}

/// Name of the adapter backing CUDA device `ordinal`
pub fn accelerator_name(ordinal: usize) -> Option<String> {
    accelerator_adapter(ordinal).map(|adapter| {
        tracing::debug!(
            ordinal,
            vendor = %adapter.vendor,
            memory_mb = adapter.total_memory_mb,
            "Selected adapter"
        );
        adapter.name
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_name_not_blank() {
        if let Some(name) = cpu_name() {
            assert_eq!(name, name.trim());
            assert!(!name.is_empty());
        }
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_accelerator_name_without_adapters() {
        assert!(accelerator_name(0).is_none());
        assert!(accelerator_adapter(0).is_none());
    }
}
