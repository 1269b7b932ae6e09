//! Mock device for testing
//!
//! Runs real (small) CPU tensors underneath but lets tests choose the
//! device kind, inject allocation and kernel failures, and inspect the
//! exact sequence of calls the runners made.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::{ComputeDevice, DeviceKind, MatrixPair};

// ─────────────────────────────────────────────────────────────────
// Mock Device Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock device behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Kind reported to the runners; `Cuda` makes the mock asynchronous
    pub kind: DeviceKind,

    /// Name reported by `name()`
    pub name: String,

    /// Fail every allocation strictly larger than this dimension
    pub fail_allocation_above: Option<usize>,

    /// Fail every multiply
    pub fail_multiply: bool,

    /// Simulated time spent inside each multiply
    pub multiply_latency: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            kind: DeviceKind::Cpu,
            name: "Mock CPU".to_string(),
            fail_allocation_above: None,
            fail_multiply: false,
            multiply_latency: Duration::ZERO,
        }
    }
}

impl MockConfig {
    /// An asynchronous accelerator stand-in
    pub fn accelerator() -> Self {
        Self {
            kind: DeviceKind::Cuda,
            name: "Mock GPU".to_string(),
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Device
// ─────────────────────────────────────────────────────────────────

/// One recorded interaction with the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    Allocate(usize),
    Multiply,
    Synchronize,
}

/// Mock implementation of ComputeDevice for testing
pub struct MockDevice {
    config: MockConfig,
    calls: RwLock<Vec<MockCall>>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            calls: RwLock::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().clone()
    }

    /// Dimensions requested from `allocate`, in order
    pub fn allocations(&self) -> Vec<usize> {
        self.calls
            .read()
            .iter()
            .filter_map(|c| match c {
                MockCall::Allocate(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn call_count(&self, call: MockCall) -> usize {
        self.calls.read().iter().filter(|c| **c == call).count()
    }

    /// Highest number of multiplies that were ever in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    fn record(&self, call: MockCall) {
        self.calls.write().push(call);
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDevice for MockDevice {
    fn kind(&self) -> DeviceKind {
        self.config.kind
    }

    fn name(&self) -> String {
        self.config.name.clone()
    }

    fn allocate(&self, dimension: usize) -> Result<MatrixPair> {
        self.record(MockCall::Allocate(dimension));

        if let Some(limit) = self.config.fail_allocation_above {
            if dimension > limit {
                return Err(Error::allocation_failed(
                    self.config.kind,
                    dimension,
                    "simulated out of memory",
                ));
            }
        }

        MatrixPair::standard_normal(&candle_core::Device::Cpu, self.config.kind, dimension)
    }

    fn multiply(&self, operands: &MatrixPair) -> Result<()> {
        self.record(MockCall::Multiply);

        if self.config.fail_multiply {
            return Err(Error::Kernel {
                device: self.config.kind,
                source: candle_core::Error::Msg("simulated kernel failure".to_string()),
            });
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);

        if !self.config.multiply_latency.is_zero() {
            std::thread::sleep(self.config.multiply_latency);
        }
        let result = operands.multiply(DeviceKind::Cpu).map(|_| ());

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn synchronize(&self) -> Result<()> {
        self.record(MockCall::Synchronize);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let device = MockDevice::new();
        let operands = device.allocate(4).unwrap();
        device.multiply(&operands).unwrap();
        device.synchronize().unwrap();

        assert_eq!(
            device.calls(),
            vec![MockCall::Allocate(4), MockCall::Multiply, MockCall::Synchronize]
        );
    }

    #[test]
    fn test_mock_allocation_threshold() {
        let device = MockDevice::with_config(MockConfig {
            fail_allocation_above: Some(8),
            ..Default::default()
        });

        assert!(device.allocate(8).is_ok());
        assert!(device.allocate(9).unwrap_err().is_allocation_failure());
        assert_eq!(device.allocations(), vec![8, 9]);
    }

    #[test]
    fn test_mock_kernel_failure() {
        let device = MockDevice::with_config(MockConfig {
            fail_multiply: true,
            ..Default::default()
        });
        let operands = device.allocate(4).unwrap();
        assert!(matches!(device.multiply(&operands), Err(Error::Kernel { .. })));
    }

    #[test]
    fn test_mock_accelerator_is_async() {
        let device = MockDevice::with_config(MockConfig::accelerator());
        assert!(device.is_async());
        assert_eq!(device.describe().id, DeviceKind::Cuda);
    }
}
