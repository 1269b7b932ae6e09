//! Backend module for compute devices
//!
//! This module provides the device abstraction the workload runners
//! target and implementations for each supported hardware kind.

mod traits;
mod registry;
mod cpu;

#[cfg(feature = "cuda")]
mod cuda;

#[cfg(test)]
mod mock;

pub use traits::*;
pub use registry::*;
pub use cpu::CpuDevice;

#[cfg(feature = "cuda")]
pub use cuda::CudaDevice;

#[cfg(test)]
pub use mock::{MockCall, MockConfig, MockDevice};
