//! System module for diagnostics workloads
//!
//! Provides:
//! - Host memory and disk usage
//! - Hardware identity strings
//! - The timed matmul kernel
//! - Benchmark and stress runners built on it

pub mod identity;
pub mod kernel;
mod stats;
mod benchmark;
mod stress;

pub use stats::*;
pub use benchmark::*;
pub use stress::*;
