//! Device Registry
//!
//! Tracks the devices usable right now and owns one exclusive lock per
//! physical device so concurrent requests never drive the same device at
//! once. Slots are never removed, so a device keeps its lock for the life
//! of the process; a missing accelerator is looked for again on every
//! request until one shows up.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::DeviceSettings;

use super::{ComputeDevice, CpuDevice, DeviceDescriptor, DeviceKind, SharedDevice};

/// Runtime check for an accelerator; `None` when none is usable
pub type AcceleratorOpener = Box<dyn Fn() -> Option<SharedDevice> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────
// Registered Device
// ─────────────────────────────────────────────────────────────────

/// A device together with its exclusive-use lock
#[derive(Clone)]
pub struct DeviceSlot {
    device: SharedDevice,
    lock: Arc<Mutex<()>>,
}

impl DeviceSlot {
    fn new(device: SharedDevice) -> Self {
        Self {
            device,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    pub fn kind(&self) -> DeviceKind {
        self.device.kind()
    }

    /// Wait for exclusive use of the device.
    ///
    /// Waiters are served in arrival order. The guard is owned so it can
    /// travel into a blocking task with the kernel work.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.lock).lock_owned().await
    }
}

// ─────────────────────────────────────────────────────────────────
// Device Registry
// ─────────────────────────────────────────────────────────────────

/// Ordered set of usable devices, baseline first
pub struct DeviceRegistry {
    slots: RwLock<Vec<DeviceSlot>>,
    /// `None` when accelerators are disabled or injected by a test
    opener: Option<AcceleratorOpener>,
}

impl DeviceRegistry {
    /// Inspect the host. The CPU is always present; the accelerator is
    /// added only when enabled, compiled in, and actually usable.
    pub fn detect(settings: &DeviceSettings) -> Self {
        let opener: Option<AcceleratorOpener> = if settings.enable_accelerator {
            let ordinal = settings.cuda_ordinal;
            Some(Box::new(move || open_accelerator(ordinal)))
        } else {
            tracing::info!("Accelerator disabled by configuration");
            None
        };

        let registry = Self::with_opener(vec![Arc::new(CpuDevice::new())], opener);
        tracing::info!(
            devices = ?registry.kinds(),
            "Device enumeration complete"
        );
        registry
    }

    /// Build from pre-constructed devices, keeping their order
    pub fn from_devices(devices: Vec<SharedDevice>) -> Self {
        Self::with_opener(devices, None)
    }

    /// Build from pre-constructed devices and run `opener` once now
    pub fn with_opener(devices: Vec<SharedDevice>, opener: Option<AcceleratorOpener>) -> Self {
        let registry = Self {
            slots: RwLock::new(devices.into_iter().map(DeviceSlot::new).collect()),
            opener,
        };
        registry.refresh();
        registry
    }

    /// Try to open the accelerator again if none is registered yet.
    ///
    /// Blocking: opening may initialize a device runtime.
    pub fn refresh(&self) {
        let Some(ref opener) = self.opener else {
            return;
        };
        if self.accelerator().is_some() {
            return;
        }

        let mut slots = self.slots.write();
        // Another request may have won the race for the write lock
        if slots.iter().any(|s| s.device.is_async()) {
            return;
        }
        if let Some(device) = opener() {
            tracing::info!(device = %device.kind(), "Accelerator registered");
            slots.push(DeviceSlot::new(device));
        }
    }

    /// [`refresh`](Self::refresh) on the blocking pool
    pub async fn refresh_async(self: &Arc<Self>) {
        let registry = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || registry.refresh()).await {
            tracing::warn!(error = %e, "Accelerator lookup aborted");
        }
    }

    /// All devices in enumeration order
    pub fn slots(&self) -> Vec<DeviceSlot> {
        self.slots.read().clone()
    }

    pub fn kinds(&self) -> Vec<DeviceKind> {
        self.slots.read().iter().map(DeviceSlot::kind).collect()
    }

    /// First asynchronous device, if any
    pub fn accelerator(&self) -> Option<DeviceSlot> {
        self.slots.read().iter().find(|s| s.device.is_async()).cloned()
    }

    /// Device for single-device workloads: the accelerator when present,
    /// otherwise the first device.
    pub fn preferred(&self) -> Option<DeviceSlot> {
        self.accelerator().or_else(|| self.slots.read().first().cloned())
    }

    pub fn describe(&self) -> Vec<DeviceDescriptor> {
        self.slots.read().iter().map(|s| s.device.describe()).collect()
    }
}

#[cfg(feature = "cuda")]
fn open_accelerator(ordinal: usize) -> Option<SharedDevice> {
    match super::CudaDevice::open(ordinal) {
        Ok(device) => Some(Arc::new(device)),
        Err(e) => {
            tracing::info!(error = %e, "No usable CUDA device");
            None
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn open_accelerator(_ordinal: usize) -> Option<SharedDevice> {
    tracing::debug!("Built without the 'cuda' feature; skipping accelerator lookup");
    None
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
