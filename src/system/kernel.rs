//! Timed matrix-multiply kernel
//!
//! One allocation, one multiply, one elapsed time. On an asynchronous
//! device the timer is bracketed by synchronize barriers, otherwise it
//! would measure only the enqueue.

use std::time::Instant;

use crate::backend::{ComputeDevice, MatrixPair};
use crate::error::{Error, Result};

/// What to run: a square dimension exactly as the caller supplied it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub dimension: i64,
}

impl WorkloadSpec {
    pub fn new(dimension: i64) -> Self {
        Self { dimension }
    }

    /// Dimension usable for allocation; non-positive values are rejected here,
    /// not at the request boundary.
    pub fn validated_dimension(&self) -> Result<usize> {
        if self.dimension <= 0 {
            return Err(Error::InvalidDimension { dimension: self.dimension });
        }
        usize::try_from(self.dimension).map_err(|_| Error::InvalidDimension { dimension: self.dimension })
    }
}

/// Allocate operands and time one multiply.
///
/// Returns elapsed seconds. Any error belongs to this device only; the
/// caller decides how to report it.
pub fn run(device: &dyn ComputeDevice, spec: &WorkloadSpec) -> Result<f64> {
    let dimension = spec.validated_dimension()?;
    let operands = device.allocate(dimension)?;

    // Drain the allocation's random fill so it is not billed to the multiply
    if device.is_async() {
        device.synchronize()?;
    }

    let start = Instant::now();
    execute(device, &operands)?;
    let elapsed = start.elapsed().as_secs_f64();

    tracing::debug!(
        device = %device.kind(),
        dimension,
        elapsed_secs = elapsed,
        "Kernel complete"
    );

    Ok(elapsed)
}

/// One multiply that has fully completed on return
pub fn execute(device: &dyn ComputeDevice, operands: &MatrixPair) -> Result<()> {
    device.multiply(operands)?;
    if device.is_async() {
        device.synchronize()?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
