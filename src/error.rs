//! Error types for hwdiag
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! The HTTP mapping lives in `api::error`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::DeviceKind;

/// Result type alias for hwdiag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    Serialization = 204,

    // Server errors (3xx)
    ServerBind = 300,

    // Execution errors (5xx)
    KernelFailed = 500,
    InvalidDimension = 501,

    // Resource errors (7xx)
    ResourceMemory = 700,

    // Device errors (8xx)
    DeviceUnavailable = 810,
    DeviceMemoryInsufficient = 812,
    StressAllocationFailed = 813,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            500..=599 => 50,
            700..=799 => 70,
            800..=899 => 80,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Server Errors
    // ─────────────────────────────────────────────────────────────

    /// Could not bind the HTTP listener
    #[error("Failed to bind {addr}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// A matrix multiply or synchronize failed on a device
    #[error("Kernel failed on {device}: {source}")]
    Kernel {
        device: DeviceKind,
        #[source]
        source: candle_core::Error,
    },

    /// Matrix dimension cannot describe a square matrix
    #[error("Invalid matrix dimension: {dimension}")]
    InvalidDimension { dimension: i64 },

    // ─────────────────────────────────────────────────────────────
    // Resource / Device Errors
    // ─────────────────────────────────────────────────────────────

    /// Host memory budget exceeded before allocating
    #[error("Memory limit exceeded: requested {requested_mb}MB, available {available_mb}MB")]
    MemoryLimit { requested_mb: u64, available_mb: u64 },

    /// Device runtime not present or could not be initialized
    #[error("Device {device} unavailable: {message}")]
    DeviceUnavailable { device: DeviceKind, message: String },

    /// Operand allocation failed on a device
    #[error("Failed to allocate {dimension}x{dimension} matrices on {device}: {message}")]
    AllocationFailed {
        device: DeviceKind,
        dimension: usize,
        message: String,
    },

    /// Both the primary and fallback stress allocations failed
    #[error("Stress test could not allocate on {device} at {primary} or {fallback}: {message}")]
    StressAllocation {
        device: DeviceKind,
        primary: usize,
        fallback: usize,
        message: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) | Error::Json(_) => ErrorCode::Serialization,

            Error::ServerBind { .. } => ErrorCode::ServerBind,

            Error::Kernel { .. } => ErrorCode::KernelFailed,
            Error::InvalidDimension { .. } => ErrorCode::InvalidDimension,

            Error::MemoryLimit { .. } => ErrorCode::ResourceMemory,
            Error::DeviceUnavailable { .. } => ErrorCode::DeviceUnavailable,
            Error::AllocationFailed { .. } => ErrorCode::DeviceMemoryInsufficient,
            Error::StressAllocation { .. } => ErrorCode::StressAllocationFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the failure happened while placing operands on a device.
    ///
    /// These are the failures the stress fallback reacts to.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(
            self,
            Error::AllocationFailed { .. } | Error::MemoryLimit { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'hwdiag config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'hwdiag config validate' to see details."
            ),
            Error::ConfigValidation { .. } | Error::Config(_) => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::ServerBind { .. } => Some(
                "Another process may be using this port. Pick a different one with --port."
            ),
            Error::MemoryLimit { .. } | Error::AllocationFailed { .. } => Some(
                "Use a smaller matrix size or close other applications to free memory."
            ),
            Error::StressAllocation { .. } => Some(
                "Lower 'stress.fallback_dimension' in the configuration, or free device memory."
            ),
            Error::DeviceUnavailable { .. } => Some(
                "Check that GPU drivers and the CUDA runtime are installed, and that hwdiag was built with --features cuda."
            ),
            Error::InvalidDimension { .. } => Some(
                "Matrix size must be a positive integer."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an allocation failure
    pub fn allocation_failed(device: DeviceKind, dimension: usize, message: impl Into<String>) -> Self {
        Error::AllocationFailed {
            device,
            dimension,
            message: message.into(),
        }
    }

    /// Create a memory limit error
    pub fn memory_limit(requested_mb: u64, available_mb: u64) -> Self {
        Error::MemoryLimit {
            requested_mb,
            available_mb,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
