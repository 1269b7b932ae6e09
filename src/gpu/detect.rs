//! Adapter enumeration via Vulkan
//!
//! Uses the Vulkan API (via ash) only to read adapter properties; no
//! logical device is ever created.

use crate::error::Result;

use super::GpuInfo;

/// Enumerate every graphics adapter the Vulkan loader can see
#[cfg(feature = "gpu")]
pub fn detect_gpus() -> Result<Vec<GpuInfo>> {
    use ash::vk;

    use super::GpuVendor;
    use crate::backend::DeviceKind;
    use crate::error::Error;

    let unavailable = |message: String| Error::DeviceUnavailable {
        device: DeviceKind::Cuda,
        message,
    };

    let entry = unsafe { ash::Entry::load() }
        .map_err(|e| unavailable(format!("Failed to load Vulkan: {}", e)))?;

    let app_info = vk::ApplicationInfo::builder()
        .application_name(c"hwdiag")
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    let create_info = vk::InstanceCreateInfo::builder().application_info(&app_info);

    let instance = unsafe { entry.create_instance(&create_info, None) }
        .map_err(|e| unavailable(format!("Failed to create Vulkan instance: {:?}", e)))?;

    let physical_devices = match unsafe { instance.enumerate_physical_devices() } {
        Ok(devices) => devices,
        Err(e) => {
            unsafe { instance.destroy_instance(None) };
            return Err(unavailable(format!("Failed to enumerate adapters: {:?}", e)));
        }
    };

    let gpus = physical_devices
        .iter()
        .enumerate()
        .map(|(idx, device)| {
            let properties = unsafe { instance.get_physical_device_properties(*device) };
            let memory = unsafe { instance.get_physical_device_memory_properties(*device) };

            let name = unsafe {
                std::ffi::CStr::from_ptr(properties.device_name.as_ptr())
                    .to_string_lossy()
                    .to_string()
            };

            GpuInfo {
                id: idx as u32,
                name,
                vendor: GpuVendor::from_vendor_id(properties.vendor_id),
                total_memory_mb: device_local_mb(&memory),
                is_discrete: properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU,
            }
        })
        .collect::<Vec<_>>();

    unsafe { instance.destroy_instance(None) };

    tracing::debug!(count = gpus.len(), "Enumerated graphics adapters");
    Ok(gpus)
}

#[cfg(feature = "gpu")]
fn device_local_mb(memory: &ash::vk::PhysicalDeviceMemoryProperties) -> u64 {
    memory.memory_heaps[..memory.memory_heap_count as usize]
        .iter()
        .filter(|heap| heap.flags.contains(ash::vk::MemoryHeapFlags::DEVICE_LOCAL))
        .map(|heap| heap.size)
        .sum::<u64>()
        / (1024 * 1024)
}

/// Without the `gpu` feature there is no adapter source
#[cfg(not(feature = "gpu"))]
pub fn detect_gpus() -> Result<Vec<GpuInfo>> {
    tracing::debug!("Adapter enumeration not compiled (use --features gpu)");
    Ok(vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_gpus_no_panic() {
        // Hosts without a Vulkan loader report an error, never a panic
        let _ = detect_gpus();
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_detect_without_feature_is_empty() {
        assert!(detect_gpus().unwrap().is_empty());
    }
}
