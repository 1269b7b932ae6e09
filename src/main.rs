//! hwdiag - Hardware diagnostics service
//!
//! This is the main entry point for the hwdiag binary. It either serves the
//! diagnostics API for a local dashboard or runs one diagnostic directly
//! from the terminal.

mod api;
mod backend;
mod cli;
mod config;
mod error;
mod gpu;
mod logging;
mod system;
mod version;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::backend::DeviceRegistry;
use crate::cli::{Cli, Commands};
use crate::config::DiagConfig;
use crate::error::{Error, Result};
use crate::system::{BenchmarkReport, BenchmarkRunner, DeviceTiming, StressRunner, SystemInfo, SystemSnapshot};

fn main() {
    if let Err(e) = run() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // For commands that don't need full logging, use simple setup
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone());
        }
        Commands::Stats { json } => {
            logging::init_simple(if cli.quiet { tracing::Level::ERROR } else { tracing::Level::WARN })?;
            return show_stats(*json);
        }
        _ => {}
    }

    let config_path = match &cli.command {
        Commands::Serve { config, .. }
        | Commands::Benchmark { config, .. }
        | Commands::Stress { config, .. }
        | Commands::Devices { config } => config.clone(),
        _ => None,
    };

    let mut config = DiagConfig::load(config_path.as_deref())?;

    if let Commands::Serve { host, port, .. } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        features = %build.features,
        cuda = build.has_cuda(),
        profile = %build.profile,
        "Starting hwdiag"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("hwdiag")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let registry = Arc::new(DeviceRegistry::detect(&config.devices));

    match cli.command {
        Commands::Serve { .. } => runtime.block_on(serve(config, registry)),
        Commands::Benchmark { size, output, json, .. } => {
            let size = size.unwrap_or(config.benchmark.default_size);
            let report = runtime.block_on(BenchmarkRunner::new(registry).run(size));
            print_benchmark(&report, json)?;
            if let Some(path) = output {
                report.save(Path::new(&path))?;
                println!("Report saved to: {}", path);
            }
            Ok(())
        }
        Commands::Stress { duration, .. } => {
            let duration = duration.unwrap_or(config.stress.default_duration_secs);
            let runner = StressRunner::new(registry, config.stress.clone());
            let report = runtime.block_on(runner.run(duration))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Devices { .. } => {
            for device in registry.describe() {
                println!(
                    "{:<6} {}{}",
                    device.id,
                    device.name,
                    if device.asynchronous { " (async)" } else { "" }
                );
            }
            Ok(())
        }
        Commands::Version | Commands::Config { .. } | Commands::Stats { .. } => {
            // Already handled above
            unreachable!();
        }
    }
}

/// Run the API server until Ctrl+C
async fn serve(config: DiagConfig, registry: Arc<DeviceRegistry>) -> Result<()> {
    let info = SystemInfo::collect();
    info!(
        hostname = %info.hostname,
        cpu = %info.cpu_name,
        cpu_count = info.cpu_count,
        os = %info.os_version,
        arch = %info.arch,
        devices = ?registry.kinds(),
        "System info collected"
    );

    api::serve(&config, registry).await
}

fn print_benchmark(report: &BenchmarkReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("Benchmark Results ({0}x{0} f32 matmul):", report.dimension);
    println!("  CPU: {}", report.cpu_name);
    if let Some(ref gpu) = report.gpu_name {
        println!("  GPU: {}", gpu);
    }
    for m in &report.measurements {
        match m.timing {
            DeviceTiming::Completed(secs) => println!("  {:<5} {:>10.4}s", m.device.name(), secs),
            DeviceTiming::Failed(ref reason) => println!("  {:<5} {:>10}  ({})", m.device.name(), "failed", reason),
        }
    }
    println!("  {}", report.summary);
    Ok(())
}

fn show_stats(json: bool) -> Result<()> {
    let snapshot = SystemSnapshot::collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let info = SystemInfo::collect();
    println!("Host: {} ({} {}, {})", info.hostname, info.os_version, info.arch, info.cpu_name);
    println!(
        "RAM:  {:.2} / {:.2} GB ({:.1}%)",
        snapshot.ram.used_gb, snapshot.ram.total_gb, snapshot.ram.percent
    );
    println!(
        "Disk: {:.2} / {:.2} GB ({:.1}%)",
        snapshot.disk.used_gb, snapshot.disk.total_gb, snapshot.disk.percent
    );
    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: cli::ConfigSubcommand) -> Result<()> {
    use cli::ConfigSubcommand;

    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = DiagConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to: {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            DiagConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
