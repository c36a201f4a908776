//! flipscreen-view: entry point.
//!
//! ```text
//! flipscreen-view                         Connect with defaults
//! flipscreen-view session.y4m             Also record to a file
//! flipscreen-view --config <path>         Use a config TOML
//! flipscreen-view --device <host:port>    Override the bridge address
//! flipscreen-view --gen-config            Print the default config and exit
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flipscreen_core::render::MAX_FPS;
use flipscreen_core::transport::bridge;
use flipscreen_core::{ExitReason, RenderLoop};

use flipscreen_view::config::{LoggingConfig, ViewerConfig};
use flipscreen_view::display::TerminalDisplay;
use flipscreen_view::recorder::Y4mRecorder;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "flipscreen-view",
    version,
    about = "View and record a remote 128x64 screen"
)]
struct Cli {
    /// Record the session to this file (YUV4MPEG2).
    output: Option<PathBuf>,

    /// Path to configuration TOML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bridge address (overrides config). Example: 127.0.0.1:7340
    #[arg(short, long)]
    device: Option<String>,

    /// Print the default configuration and exit. With `--config`, write
    /// it to that path instead.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        match &cli.config {
            Some(path) => ViewerConfig::write_default(path)?,
            None => println!("{}", toml::to_string_pretty(&ViewerConfig::default())?),
        }
        return Ok(());
    }

    let (mut config, config_note) = match cli.config.as_deref() {
        Some(path) => ViewerConfig::load(path),
        None => (ViewerConfig::default(), None),
    };
    if let Some(addr) = cli.device {
        config.network.device_address = addr;
    }

    init_tracing(&config.logging)?;
    info!("flipscreen-view v{}", env!("CARGO_PKG_VERSION"));
    if let Some(note) = config_note {
        warn!("{note}");
        eprintln!("warning: {note}");
    }

    // ── 1. Connect to the bridge ────────────────────────────────

    let address = config.network.device_address.clone();
    let (control, source) = bridge::connect(&address, config.connect_timeout())
        .await
        .inspect_err(|e| error!("cannot reach device at {address}: {e}"))?;

    // ── 2. Build the pipeline ───────────────────────────────────

    let render_config = config.to_render_config();
    let fps = render_config.fps.clamp(1, MAX_FPS);

    let display = TerminalDisplay::open(format!("flipscreen · {address}"))?;
    let mut pipeline = RenderLoop::new(control, source, display, render_config);

    if let Some(path) = &cli.output {
        match Y4mRecorder::create(path, fps) {
            Ok(recorder) => pipeline = pipeline.with_recorder(Box::new(recorder)),
            Err(e) => warn!("recording disabled: {e}"),
        }
    }

    // SIGINT outside the terminal's raw mode (e.g. `kill -INT`).
    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            cancel.cancel();
        }
    });

    // ── 3. Run ──────────────────────────────────────────────────

    let report = pipeline.run().await?;

    info!(
        ran_for = ?report.ran_for,
        presented = report.frames_presented,
        superseded = report.frames_superseded,
        recorded = report.frames_recorded,
        received = report.receiver.accepted,
        dropped = report.receiver.dropped,
        bytes = report.receiver.bytes,
        "viewer exiting"
    );

    match report.exit {
        ExitReason::TransportFailed => {
            if let Some(e) = &report.transport_error {
                eprintln!("connection to {address} lost: {e}");
            }
        }
        ExitReason::DisplayFailed => eprintln!("terminal display failed; see the log"),
        ExitReason::QuitRequested | ExitReason::Cancelled => {}
    }

    Ok(())
}

// ── Logging ──────────────────────────────────────────────────────

/// The terminal belongs to the display, so logs go to a file unless the
/// configured path is empty.
fn init_tracing(logging: &LoggingConfig) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}
