//! Charging gateway CLI server
//!
//! Headless process suitable for a systemd unit or a container.
//!
//! ```sh
//! # Run with the default config (~/.config/charging-gateway/config.toml)
//! charging-gateway
//!
//! # Custom config path
//! charging-gateway --config /etc/charging-gateway/config.toml
//!
//! # Override ports
//! charging-gateway --api-port 8080 --ws-port 9000
//!
//! # Validate config without starting
//! charging-gateway --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use charging_gateway::config::AppConfig;
use charging_gateway::server::{init_tracing, ServerHandle, ServerOptions};

/// Realtime charger gateway with charging-session authorization.
#[derive(Parser, Debug)]
#[command(
    name = "charging-gateway",
    version,
    about = "Realtime EV charger gateway and charging-session API",
    long_about = "Relays charger and field-hardware telemetry to dashboards over \
                  WebSocket and issues payment-backed charging-session tokens.\n\n\
                  Default config: ~/.config/charging-gateway/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the WebSocket listen port.
    #[arg(long)]
    ws_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(charging_gateway::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Log level override must land before the subscriber is installed
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }
    if let Some(port) = cli.ws_port {
        info!("CLI override: ws_port = {}", port);
        config.server.ws_port = port;
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.api_addr());
        println!("   WS address  : {}", config.server.ws_addr());
        println!("   Database    : {}", config.database.url);
        println!("   Log level   : {}", config.logging.level);
        println!("   Hubs        : {}", config.hubs.enabled.join(", "));
        println!("   Session TTL : {} min", config.sessions.window_minutes);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
