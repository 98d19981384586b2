mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use authgate_core::{
    bootstrap::{init_services, load_config},
    logging,
};

use server::AuthGateServer;

/// Login gateway for OAuth2, OpenID Connect and Steam OpenID 2.0 providers
#[derive(Debug, Parser)]
#[command(name = "authgate", version, about)]
struct Cli {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long, env = "AUTHGATE_CONFIG_PATH")]
    config: Option<String>,

    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("authgate starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Build provider adapters and stores
    let services = init_services(&config)?;
    if services.login_service.providers().is_empty() {
        tracing::warn!("No providers configured, only / and /health will answer");
    }

    // 4. Serve until shutdown
    AuthGateServer::new(config, services).start().await
}
