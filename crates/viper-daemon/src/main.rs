// crates/viper-daemon/src/main.rs
//
// Binary entrypoint for the Viper RPC dispatcher daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, builds the
// endpoint directory, transports, and dispatcher, then serves the HTTP front
// end until Ctrl-C.

mod config;
mod directory;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::DaemonConfig;
use directory::InMemoryDirectory;

use viper_rpc::{Dispatcher, HttpTransport, RpcConfig, ViperNetworkHandler, ViperRpcServer};

/// Viper RPC dispatcher: routes JSON-RPC requests to chain endpoints.
#[derive(Parser, Debug)]
#[command(name = "viper-daemon", version = "0.1.0", about = "JSON-RPC dispatcher daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.viper/dispatcher.toml")]
    config: String,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured Viper Network gateway URL.
    #[arg(long)]
    viper_gateway: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the file
    // cannot be loaded. The warning is logged once tracing is up.
    let config_path = expand_tilde(&args.config);
    let (mut daemon_config, load_error) = match DaemonConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (DaemonConfig::default(), Some(e)),
    };

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match load_error {
        None => tracing::info!("Loaded configuration from {}", config_path),
        Some(e) => tracing::warn!("Could not load config: {}. Using defaults.", e),
    }

    // CLI flags override the config file values.
    if let Some(port) = args.port {
        daemon_config.rpc_port = port;
    }
    if let Some(gateway) = args.viper_gateway {
        daemon_config.viper_gateway_url = gateway;
    }

    tracing::info!("Viper RPC Dispatcher v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Viper Network gateway: {}", daemon_config.viper_gateway_url);
    tracing::info!("Outbound timeout: {}s", daemon_config.request_timeout_secs);

    let directory = Arc::new(InMemoryDirectory::from_config(&daemon_config.endpoints));
    for (chain_id, count) in directory.chain_summary().await {
        tracing::info!("Chain {}: {} endpoint(s)", chain_id, count);
    }

    // One HTTP client shared by pass-through calls and the Viper gateway.
    let transport = HttpTransport::new(Duration::from_secs(daemon_config.request_timeout_secs));
    let viper = ViperNetworkHandler::new(&daemon_config.viper_gateway_url, transport.clone());
    let dispatcher = Dispatcher::new(directory, Arc::new(transport), Arc::new(viper));

    let rpc_config = RpcConfig {
        host: daemon_config.rpc_host.clone(),
        port: daemon_config.rpc_port,
    };
    let server = ViperRpcServer::new(rpc_config, dispatcher);

    server
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("Viper dispatcher shut down gracefully");
    Ok(())
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
