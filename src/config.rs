//! Configuration system for hwdiag
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (HWDIAG_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Hard ceiling for any stress run, whatever the configuration says
pub const STRESS_DURATION_CAP_SECS: i64 = 60;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagConfig {
    /// HTTP server settings
    pub server: ServerSettings,

    /// One-shot benchmark settings
    pub benchmark: BenchmarkSettings,

    /// Sustained-load stress test settings
    pub stress: StressSettings,

    /// Compute device selection
    pub devices: DeviceSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind
    pub host: String,

    /// TCP port to listen on
    pub port: u16,

    /// The single origin allowed to call the API cross-origin
    pub cors_origin: String,
}

/// Benchmark settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    /// Matrix dimension used when a request omits `size`
    pub default_size: i64,
}

/// Stress test settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressSettings {
    /// Duration used when a request omits `duration`
    pub default_duration_secs: i64,

    /// Upper bound every requested duration is clamped to
    pub max_duration_secs: i64,

    /// Matrix dimension tried first
    pub primary_dimension: usize,

    /// Matrix dimension tried once if the primary allocation fails
    pub fallback_dimension: usize,
}

/// Device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Look for an accelerator at all
    pub enable_accelerator: bool,

    /// CUDA device ordinal to use
    pub cuda_ordinal: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origin: "http://localhost:4321".to_string(),
        }
    }
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self { default_size: 5000 }
    }
}

impl Default for StressSettings {
    fn default() -> Self {
        Self {
            default_duration_secs: 10,
            max_duration_secs: 60,
            primary_dimension: 10_000,
            fallback_dimension: 5_000,
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            enable_accelerator: true,
            cuda_ordinal: 0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl DiagConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.clone(),
                source: e,
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::ConfigNotFound { path })
            };
        }

        let search_paths = [
            PathBuf::from("hwdiag.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("hwdiag").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".hwdiag").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/hwdiag/config.toml"),
        ];

        for path in &search_paths {
            if path.is_file() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server settings
        if let Ok(val) = std::env::var("HWDIAG_HOST") {
            self.server.host = val;
        }
        if let Some(n) = env_parse("HWDIAG_PORT") {
            self.server.port = n;
        }
        if let Ok(val) = std::env::var("HWDIAG_CORS_ORIGIN") {
            self.server.cors_origin = val;
        }

        // Workload settings
        if let Some(n) = env_parse("HWDIAG_BENCHMARK_SIZE") {
            self.benchmark.default_size = n;
        }
        if let Some(n) = env_parse("HWDIAG_STRESS_DURATION") {
            self.stress.default_duration_secs = n;
        }
        if let Some(n) = env_parse("HWDIAG_STRESS_MAX_DURATION") {
            self.stress.max_duration_secs = n;
        }
        if let Some(n) = env_parse("HWDIAG_STRESS_PRIMARY_DIM") {
            self.stress.primary_dimension = n;
        }
        if let Some(n) = env_parse("HWDIAG_STRESS_FALLBACK_DIM") {
            self.stress.fallback_dimension = n;
        }

        // Device settings
        if let Ok(val) = std::env::var("HWDIAG_ENABLE_ACCELERATOR") {
            self.devices.enable_accelerator = env_flag(&val);
        }
        if let Some(n) = env_parse("HWDIAG_CUDA_ORDINAL") {
            self.devices.cuda_ordinal = n;
        }

        // Logging settings
        if let Ok(val) = std::env::var("HWDIAG_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("HWDIAG_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("HWDIAG_LOG_JSON") {
            self.logging.json_format = env_flag(&val);
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config_field_invalid("server.host", "Host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(Error::config_field_invalid("server.port", "Port must be between 1 and 65535"));
        }
        if self.server.cors_origin.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "server.cors_origin",
                "CORS origin cannot be empty",
            ));
        }

        if self.stress.max_duration_secs <= 0 || self.stress.max_duration_secs > STRESS_DURATION_CAP_SECS {
            return Err(Error::config_field_invalid(
                "stress.max_duration_secs",
                format!(
                    "Maximum stress duration must be between 1 and {} seconds, got {}",
                    STRESS_DURATION_CAP_SECS, self.stress.max_duration_secs
                ),
            ));
        }
        if self.stress.primary_dimension == 0 || self.stress.fallback_dimension == 0 {
            return Err(Error::config_field_invalid(
                "stress.primary_dimension",
                "Stress matrix dimensions must be positive",
            ));
        }
        if self.stress.fallback_dimension >= self.stress.primary_dimension {
            return Err(Error::config_field_invalid(
                "stress.fallback_dimension",
                format!(
                    "Fallback dimension ({}) must be smaller than primary dimension ({})",
                    self.stress.fallback_dimension, self.stress.primary_dimension
                ),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".hwdiag")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Default configuration content with comments
const DEFAULT_CONFIG: &str = r#"# hwdiag configuration

[server]
# Interface and port for the HTTP API
host = "127.0.0.1"
port = 8000

# The only origin allowed to call the API from a browser
cors_origin = "http://localhost:4321"

[benchmark]
# Matrix dimension when a request does not specify one
default_size = 5000

[stress]
# Duration when a request does not specify one (seconds)
default_duration_secs = 10

# Hard upper bound for any stress test (seconds)
max_duration_secs = 60

# Matrix dimension tried first, and the one-time fallback on allocation failure
primary_dimension = 10000
fallback_dimension = 5000

[devices]
# Look for a CUDA accelerator (requires a build with --features cuda)
enable_accelerator = true
cuda_ordinal = 0

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.hwdiag/logs/hwdiag.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = DiagConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.cors_origin, "http://localhost:4321");
        assert_eq!(config.benchmark.default_size, 5000);
        assert_eq!(config.stress.max_duration_secs, 60);
        assert_eq!(config.stress.primary_dimension, 10_000);
        assert_eq!(config.stress.fallback_dimension, 5_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        env::set_var("HWDIAG_PORT", "9100");
        env::set_var("HWDIAG_STRESS_MAX_DURATION", "30");
        env::set_var("HWDIAG_ENABLE_ACCELERATOR", "false");

        let mut config = DiagConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.stress.max_duration_secs, 30);
        assert!(!config.devices.enable_accelerator);

        env::remove_var("HWDIAG_PORT");
        env::remove_var("HWDIAG_STRESS_MAX_DURATION");
        env::remove_var("HWDIAG_ENABLE_ACCELERATOR");
    }

    #[test]
    fn test_validation_fallback_not_smaller() {
        let mut config = DiagConfig::default();
        config.stress.fallback_dimension = config.stress.primary_dimension;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_port() {
        let mut config = DiagConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_max_duration() {
        let mut config = DiagConfig::default();
        config.stress.max_duration_secs = 0;
        assert!(config.validate().is_err());

        config.stress.max_duration_secs = STRESS_DURATION_CAP_SECS;
        assert!(config.validate().is_ok());

        for too_long in [STRESS_DURATION_CAP_SECS + 1, 3600, i64::MAX] {
            config.stress.max_duration_secs = too_long;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("between 1 and 60"));
        }
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = DiagConfig::default();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_default_template_parses() {
        let config: DiagConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.stress.primary_dimension, 10_000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: DiagConfig = toml::from_str(
            r#"
[server]
port = 8080

[stress]
max_duration_secs = 20
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.stress.max_duration_secs, 20);
        assert_eq!(config.stress.default_duration_secs, 10);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = DiagConfig::load(Some("/nonexistent/hwdiag.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_init_config_and_refuse_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("hwdiag.toml");
        let path_str = path.to_str().unwrap();

        let written = init_config(Some(path_str), false).unwrap();
        assert_eq!(written, path);
        assert!(init_config(Some(path_str), false).is_err());
        assert!(init_config(Some(path_str), true).is_ok());

        let loaded = DiagConfig::load(Some(path_str)).unwrap();
        assert_eq!(loaded.server.cors_origin, "http://localhost:4321");
    }

    #[test]
    fn test_bind_addr() {
        let config = DiagConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
    }
}
