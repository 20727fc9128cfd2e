//! camlink host: entry point.
//!
//! Discovers phone cameras streaming on the LAN, keeps one receiver per
//! phone, and republishes the newest frame of each as one virtual webcam.
//!
//! # Usage
//!
//! ```text
//! camlink-host [OPTIONS]
//!
//! Options:
//!   --config <PATH>           Config file [default: platform config dir]
//!   --write-default-config    Write the default config file and exit
//!   --device <PATH>           v4l2loopback node, overrides [output].device
//!   --no-console              Do not read control keys from stdin
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Description                              |
//! |-------------------|------------------------------------------|
//! | `CAMLINK_CONFIG`  | Same as `--config`                       |
//! | `CAMLINK_DEVICE`  | Same as `--device`                       |
//! | `RUST_LOG`        | Log filter, overrides `[logging].log_level` |
//!
//! # Task layout
//!
//! ```text
//!   scanner ──launch──► supervisor ──spawn──► receiver × N ──publish──┐
//!                                                                     ▼
//!   console ──commands──► session / registry ◄──snapshot── output publisher ──► sink
//! ```
//!
//! Every task observes the same `CancellationToken`; Ctrl+C or the `q` key
//! cancels it and `main` waits for all of them to finish.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use camlink_core::{Compositor, FrameDecoder, ImageFrameDecoder};
use camlink_host::application::compose_output::ComposeOutputUseCase;
use camlink_host::application::control::ControlUseCase;
use camlink_host::application::registry::StreamRegistry;
use camlink_host::application::session::Session;
use camlink_host::infrastructure::console::{forward_lines, run_console};
use camlink_host::infrastructure::network::probe::TcpPortProber;
use camlink_host::infrastructure::network::scanner::DiscoveryScanner;
use camlink_host::infrastructure::network::supervisor::ReceiverSupervisor;
use camlink_host::infrastructure::output::publisher::{OutputPublisher, SinkOpener};
use camlink_host::infrastructure::output::{open_sink, FrameSink, SinkError};
use camlink_host::infrastructure::storage::config::{self, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Combine phone cameras on the LAN into one virtual webcam.
#[derive(Debug, Parser)]
#[command(name = "camlink-host", version)]
struct Cli {
    /// Path to the TOML config file.
    ///
    /// Defaults to `config.toml` in the platform config directory.  A missing
    /// file means "use defaults".
    #[arg(long, env = "CAMLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Write the default config to the config path and exit.
    #[arg(long)]
    write_default_config: bool,

    /// v4l2loopback device node, e.g. `/dev/video10`.
    #[arg(long, env = "CAMLINK_DEVICE")]
    device: Option<PathBuf>,

    /// Run without the interactive stdin console.
    #[arg(long)]
    no_console: bool,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => config::load_config().context("failed to load config")?,
        };
        if let Some(device) = &self.device {
            cfg.output.device = Some(device.display().to_string());
        }
        Ok(cfg)
    }

    /// Writes the default config to `--config` or the platform path.
    fn write_default_config(&self) -> anyhow::Result<PathBuf> {
        let cfg = AppConfig::default();
        match &self.config {
            Some(path) => {
                config::save_config_to(&cfg, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                Ok(path.clone())
            }
            None => config::save_config(&cfg).context("failed to write default config"),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.write_default_config {
        let path = cli.write_default_config()?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let cfg = cli.load_config()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.log_level)),
        )
        .init();

    let output_settings = cfg.output_settings();
    info!(
        "camlink host starting: {}x{} @ {} fps, port {}, device {}",
        output_settings.width,
        output_settings.height,
        output_settings.fps,
        cfg.network.port,
        output_settings
            .device
            .as_ref()
            .map_or_else(|| "none (headless)".to_string(), |d| d.display().to_string())
    );

    let shutdown = CancellationToken::new();
    let registry = Arc::new(StreamRegistry::new());
    let session = Arc::new(Session::new());
    let decoder: Arc<dyn FrameDecoder> = Arc::new(ImageFrameDecoder::new());

    // ── Receivers and discovery ───────────────────────────────────────────────
    let supervisor = Arc::new(ReceiverSupervisor::new(
        Arc::clone(&registry),
        decoder,
        cfg.receiver_config(),
        shutdown.clone(),
    ));
    let scanner = DiscoveryScanner::new(
        cfg.scan_config(),
        Arc::new(TcpPortProber),
        Arc::clone(&registry),
        supervisor.clone(),
    );
    let scanner_task = tokio::spawn(scanner.run(shutdown.clone()));

    // ── Output ────────────────────────────────────────────────────────────────
    let compose = Arc::new(ComposeOutputUseCase::new(
        Arc::clone(&registry),
        Arc::clone(&session),
        Compositor::new(output_settings.width, output_settings.height),
    ));
    let reopen_backoff = output_settings.reopen_backoff;
    let opener: SinkOpener = Box::new(move || -> Result<Box<dyn FrameSink>, SinkError> {
        open_sink(&output_settings)
    });
    let publisher = OutputPublisher::new(compose, opener, reopen_backoff);
    let publisher_task = tokio::spawn(publisher.run(shutdown.clone()));

    // ── Console ───────────────────────────────────────────────────────────────
    let console_task = if cli.no_console {
        None
    } else {
        let control = ControlUseCase::new(Arc::clone(&registry), Arc::clone(&session));
        let console_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            let result = match forward_lines(std::io::BufReader::new(std::io::stdin())) {
                Ok(input) => {
                    run_console(control, input, tokio::io::stdout(), console_shutdown).await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("console stopped: {e}");
            }
        }))
    };

    // ── Shutdown ──────────────────────────────────────────────────────────────
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!("failed to listen for Ctrl+C: {e}; quit with `q`");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => info!("shutdown requested"),
    }
    shutdown.cancel();

    if let Err(e) = scanner_task.await {
        error!("scanner task failed: {e}");
    }
    if let Err(e) = publisher_task.await {
        error!("publisher task failed: {e}");
    }
    supervisor.join_all().await;
    if let Some(task) = console_task {
        if let Err(e) = task.await {
            error!("console task failed: {e}");
        }
    }
    info!("camlink host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
