//! GPU adapter discovery
//!
//! Used to put a human-readable name on the accelerator. The CUDA
//! runtime does not expose a marketing name through candle, so adapters
//! are enumerated through Vulkan and matched by vendor.

mod detect;

pub use detect::*;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// GPU Vendor Identification
// ─────────────────────────────────────────────────────────────────

/// GPU vendors identified by PCI vendor ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Unknown(u32),
}

impl GpuVendor {
    pub const NVIDIA_VENDOR_ID: u32 = 0x10DE;
    pub const AMD_VENDOR_ID: u32 = 0x1002;
    pub const INTEL_VENDOR_ID: u32 = 0x8086;
    pub const APPLE_VENDOR_ID: u32 = 0x106B;

    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            Self::NVIDIA_VENDOR_ID => GpuVendor::Nvidia,
            Self::AMD_VENDOR_ID => GpuVendor::Amd,
            Self::INTEL_VENDOR_ID => GpuVendor::Intel,
            Self::APPLE_VENDOR_ID => GpuVendor::Apple,
            other => GpuVendor::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GpuVendor::Nvidia => "NVIDIA",
            GpuVendor::Amd => "AMD",
            GpuVendor::Intel => "Intel",
            GpuVendor::Apple => "Apple",
            GpuVendor::Unknown(_) => "Unknown",
        }
    }

    /// Whether adapters from this vendor can back a CUDA device
    pub fn runs_cuda(&self) -> bool {
        matches!(self, GpuVendor::Nvidia)
    }
}

impl std::fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// GPU Information
// ─────────────────────────────────────────────────────────────────

/// One enumerated graphics adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    /// Enumeration index
    pub id: u32,
    /// Adapter name as reported by the driver
    pub name: String,
    pub vendor: GpuVendor,
    /// Device-local memory in MB
    pub total_memory_mb: u64,
    /// Discrete card as opposed to integrated graphics
    pub is_discrete: bool,
}

// ─────────────────────────────────────────────────────────────────
// Adapter Selection
// ─────────────────────────────────────────────────────────────────

/// Pick the adapter most likely to back CUDA device `ordinal`.
///
/// Only NVIDIA adapters count. They are ranked the way the CUDA runtime
/// orders devices by default, fastest first: discrete cards, then the
/// most memory, then enumeration order.
pub fn select_cuda_adapter(gpus: &[GpuInfo], ordinal: usize) -> Option<&GpuInfo> {
    let mut candidates: Vec<&GpuInfo> = gpus.iter().filter(|g| g.vendor.runs_cuda()).collect();
    candidates.sort_by_key(|g| std::cmp::Reverse((g.is_discrete, g.total_memory_mb)));
    candidates.into_iter().nth(ordinal)
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(id: u32, name: &str, vendor: GpuVendor, memory: u64, discrete: bool) -> GpuInfo {
        GpuInfo {
            id,
            name: name.to_string(),
            vendor,
            total_memory_mb: memory,
            is_discrete: discrete,
        }
    }

    #[test]
    fn test_vendor_from_id() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0xFFFF), GpuVendor::Unknown(0xFFFF));
        assert!(GpuVendor::Nvidia.runs_cuda());
        assert!(!GpuVendor::Amd.runs_cuda());
    }

    #[test]
    fn test_select_prefers_nvidia_over_integrated() {
        let gpus = vec![
            adapter(0, "Intel UHD 770", GpuVendor::Intel, 2048, false),
            adapter(1, "NVIDIA GeForce RTX 4090", GpuVendor::Nvidia, 24564, true),
        ];
        assert_eq!(select_cuda_adapter(&gpus, 0).unwrap().id, 1);
    }

    #[test]
    fn test_select_prefers_discrete_nvidia() {
        let gpus = vec![
            adapter(0, "NVIDIA T400", GpuVendor::Nvidia, 32768, false),
            adapter(1, "NVIDIA RTX A2000", GpuVendor::Nvidia, 6144, true),
        ];
        assert_eq!(select_cuda_adapter(&gpus, 0).unwrap().name, "NVIDIA RTX A2000");
    }

    #[test]
    fn test_select_honors_ordinal() {
        let gpus = vec![
            adapter(0, "NVIDIA GeForce RTX 3060", GpuVendor::Nvidia, 12288, true),
            adapter(1, "Intel UHD 770", GpuVendor::Intel, 2048, false),
            adapter(2, "NVIDIA GeForce RTX 4090", GpuVendor::Nvidia, 24564, true),
        ];
        assert_eq!(select_cuda_adapter(&gpus, 0).unwrap().id, 2);
        assert_eq!(select_cuda_adapter(&gpus, 1).unwrap().id, 0);
        assert!(select_cuda_adapter(&gpus, 2).is_none());
    }

    #[test]
    fn test_select_ties_keep_enumeration_order() {
        let gpus = vec![
            adapter(0, "NVIDIA RTX A4000 (slot 1)", GpuVendor::Nvidia, 16384, true),
            adapter(1, "NVIDIA RTX A4000 (slot 2)", GpuVendor::Nvidia, 16384, true),
        ];
        assert_eq!(select_cuda_adapter(&gpus, 0).unwrap().id, 0);
        assert_eq!(select_cuda_adapter(&gpus, 1).unwrap().id, 1);
    }

    #[test]
    fn test_select_without_nvidia() {
        let gpus = vec![adapter(0, "Radeon RX 7900", GpuVendor::Amd, 24576, true)];
        assert!(select_cuda_adapter(&gpus, 0).is_none());
        assert!(select_cuda_adapter(&[], 0).is_none());
    }
}
