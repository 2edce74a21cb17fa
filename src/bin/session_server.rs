//! Session server - stores submitted room sessions on disk
//!
//! Usage: session-server [--config <path>]

use clap::Parser;
use room_mapper::infra::Config;
use room_mapper::io::session_server::start_session_server;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "session-server", version, about = "Room session persistence endpoint")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        bind_address = %config.server_bind_address(),
        port = %config.server_port(),
        data_dir = %config.server_data_dir(),
        log_dir = %config.server_log_dir(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_session_server(&config, shutdown_rx).await?;

    info!("session-server shutdown complete");
    Ok(())
}
