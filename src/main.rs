use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use vhost_router::config::load_config;
use vhost_router::lifecycle::{build_virtual_hosts, shutdown_signal, start};
use vhost_router::observability::{logging, metrics};

/// Virtual-host HTTP router.
#[derive(Debug, Parser)]
#[command(name = "vhost-router", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "vhost-router.toml")]
    config: PathBuf,

    /// Validate the configuration and routing table, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        mounts = config.mounts.len(),
        redirects = config.redirects.len(),
        "vhost-router starting"
    );

    if cli.check {
        return match build_virtual_hosts(&config) {
            Ok(hosts) => {
                for binding in hosts.bindings() {
                    tracing::info!(binding = %binding, "Listener configured");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Invalid routing configuration");
                ExitCode::FAILURE
            }
        };
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let running = match start(&config).await {
        Ok(running) => running,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    shutdown_signal().await;

    if let Err(e) = running.close().await {
        tracing::error!(error = %e, "Shutdown incomplete");
        return ExitCode::FAILURE;
    }
    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
