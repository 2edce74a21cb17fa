//! Room mapper - guided room capture replay
//!
//! Feeds a capture script (pose ticks and user actions) through the capture
//! state machine, exports the resulting session document and optionally
//! submits it to a session server.
//!
//! Module structure:
//! - `domain/` - Session model, coordinate frame, geometry, event log
//! - `services/` - Capture state machine, change feed, capture loop
//! - `io/` - Export, submission, scripts, session server
//! - `infra/` - Configuration

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use room_mapper::infra::Config;
use room_mapper::io::export::{build_payload, FileExporter};
use room_mapper::io::script::load_script;
use room_mapper::io::HttpSubmitter;
use room_mapper::services::change_feed::log_revisions;
use room_mapper::services::CaptureLoop;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Room mapper - replay a capture script into a room session document
#[derive(Parser, Debug)]
#[command(name = "room-mapper", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Capture script (JSON array or JSONL of actions)
    #[arg(short, long)]
    script: String,

    /// Submit the session when the script asks for it, even if disabled in config
    #[arg(long)]
    submit: bool,

    /// Override the export directory
    #[arg(long)]
    export_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for every logged action
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = %env!("CARGO_PKG_VERSION"), git = %env!("GIT_HASH"), "room_mapper_starting");

    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config);
    if args.submit {
        config = config.with_submit_enabled(true);
    }
    if let Some(dir) = args.export_dir.as_deref() {
        config = config.with_export_dir(dir);
    }

    info!(
        config_file = %config.config_file(),
        default_ceiling_height = %config.default_ceiling_height(),
        auto_floor_lock = %config.auto_floor_lock(),
        export_dir = %config.export_dir(),
        submit_enabled = %config.submit_enabled(),
        submit_url = %config.submit_url(),
        "config_loaded"
    );

    let actions = load_script(&args.script)?;

    let mut capture = CaptureLoop::from_config(&config);
    if config.submit_enabled() {
        let submitter = HttpSubmitter::from_config(&config)
            .context("Failed to build session submitter")?;
        info!(url = %submitter.url(), "submitter_ready");
        capture = capture.with_sink(Arc::new(submitter));
    }

    // Diagnostics consumer for review revisions
    tokio::spawn(log_revisions(capture.machine().subscribe()));

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    // Feed the script; stop early on Ctrl+C
    let (action_tx, action_rx) = mpsc::channel(1000);
    tokio::spawn(async move {
        for action in actions {
            if *shutdown_rx.borrow() {
                break;
            }
            if action_tx.send(action).await.is_err() {
                break;
            }
        }
    });

    // Run capture - consumes actions until the script is exhausted
    let machine = capture.run(action_rx).await;

    for line in machine.session().log().display_lines(config.log_display_lines()) {
        info!(line = %line, "session_log");
    }

    let json = build_payload(machine.session()).to_json();
    let path = FileExporter::from_config(&config).write(&json, Utc::now())?;
    info!(
        file = %path.display(),
        session_id = %machine.session().id(),
        step = %machine.step(),
        submission = %machine.submission().as_str(),
        "session_written"
    );
    if config.submit_enabled() {
        info!(status = %machine.submission().message(), "submission_status");
    }

    info!("room-mapper finished");
    Ok(())
}
