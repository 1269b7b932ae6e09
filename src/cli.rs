//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for hwdiag.

use clap::{Parser, Subcommand};

/// hwdiag - Hardware diagnostics service
///
/// Reports memory and disk usage, benchmarks matrix multiplication on the
/// CPU against a CUDA accelerator, and runs bounded stress tests. Serves
/// all of it over HTTP for a local dashboard.
#[derive(Parser, Debug)]
#[command(name = "hwdiag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Path to configuration file
        #[arg(short, long, env = "HWDIAG_CONFIG")]
        config: Option<String>,

        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Time one matrix multiply on every device and compare
    Benchmark {
        /// Path to configuration file
        #[arg(short, long, env = "HWDIAG_CONFIG")]
        config: Option<String>,

        /// Square matrix dimension (default from configuration)
        #[arg(short, long, allow_negative_numbers = true)]
        size: Option<i64>,

        /// Write the report to this file as JSON
        #[arg(short, long)]
        output: Option<String>,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a sustained full-load stress test (heats the hardware)
    Stress {
        /// Path to configuration file
        #[arg(short, long, env = "HWDIAG_CONFIG")]
        config: Option<String>,

        /// Seconds to run, capped by the configured maximum
        #[arg(short, long, allow_negative_numbers = true)]
        duration: Option<i64>,
    },

    /// Show memory and disk usage
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List usable compute devices
    Devices {
        /// Path to configuration file
        #[arg(short, long, env = "HWDIAG_CONFIG")]
        config: Option<String>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
