//! capture-dns binary entry point.

use capture_dns::{geo, store, telemetry, Config, DnsServer};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Authoritative DNS server for subdomain-scoped request capture.
#[derive(Parser, Debug)]
#[command(name = "capture-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Optional when configured
    /// entirely through `CAPTURE_DNS__*` variables.
    #[arg(short, long, default_value = "capture-dns.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()).required(false))
        .add_source(
            config::Environment::with_prefix("CAPTURE_DNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    config.dns.validate()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        server_domain = %config.dns.server_domain,
        backend = ?config.storage.backend,
        "Starting capture-dns"
    );

    let store = store::connect(&config.storage).await?;
    let geo = geo::from_config(&config.geoip)?;

    // Setup graceful shutdown
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    // Run DNS server
    let server = DnsServer::new(config.dns, store, geo);
    let result = server.run(token).await;

    // Shutdown telemetry
    telemetry::shutdown();

    if let Err(e) = result {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    info!("capture-dns shutdown complete");
    Ok(())
}
