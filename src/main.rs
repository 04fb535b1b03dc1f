//! dualgate: dual-surface HTTP front door.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  DUALGATE                    │
//!   Local client         │  ┌──────────┐    ┌────────────────────────┐  │
//!   ─────────────────────┼─▶│ loopback │───▶│ public routes          │  │
//!                        │  │ listener │    └────────────────────────┘  │
//!                        │  └──────────┘                                │
//!   Overlay peer         │  ┌──────────┐    ┌────────────────────────┐  │
//!   ─────────────────────┼─▶│ :80      │───▶│ public routes          │  │
//!   ─────── TLS ─────────┼─▶│ :443     │    │ overlay-only routes    │  │
//!                        │  └────┬─────┘    │ /who /metrics /debug/  │  │
//!                        │       │ certs    │ /quitquitquit          │  │
//!                        │  ┌────▼───────────┴────────────────────────┐ │
//!                        │  │ overlay session (join, whois, certs)    │ │
//!                        │  └─────────────────────────────────────────┘ │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use axum::{response::Html, routing::get};
use clap::Parser;

use dualgate::config::{load_config, validate_config, GatewayConfig};
use dualgate::http::diagnostics::escape_html;
use dualgate::lifecycle::signals::shutdown_on_ctrl_c;
use dualgate::observability::{logging, metrics};
use dualgate::overlay::HostOverlay;
use dualgate::{DualSurfaceServer, RouteRegistry};

#[derive(Parser, Debug)]
#[command(name = "dualgate")]
#[command(about = "Serve HTTP on loopback and on a private overlay network", long_about = None)]
struct Cli {
    /// TOML configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name to join the overlay network as.
    #[arg(long)]
    hostname: Option<String>,

    /// File holding the overlay auth key.
    #[arg(long)]
    auth_key_file: Option<PathBuf>,

    /// Overlay control-plane URL.
    #[arg(long)]
    control_url: Option<String>,

    /// Loopback bind address.
    #[arg(long)]
    local_addr: Option<String>,

    /// Log overlay session activity.
    #[arg(short, long)]
    verbose: bool,

    /// Serve the loopback surface only.
    #[arg(long)]
    no_overlay: bool,
}

impl Cli {
    fn into_config(self) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(hostname) = self.hostname {
            config.hostname = hostname;
        }
        if let Some(path) = self.auth_key_file {
            config.auth_key_path = Some(path);
        }
        if let Some(url) = self.control_url {
            config.control_url = Some(url);
        }
        if let Some(addr) = self.local_addr {
            config.local_addr = addr;
        }
        config.verbose |= self.verbose;
        if self.no_overlay {
            config.enable_overlay = false;
        }

        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose_flag = cli.verbose;

    // Logging waits for the config so `verbose` in the file applies.
    let config = match cli.into_config() {
        Ok(config) => {
            logging::init_logging(config.verbose);
            config
        }
        Err(e) => {
            logging::init_logging(verbose_flag);
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        hostname = %config.hostname,
        local_addr = %config.local_addr,
        overlay = config.enable_overlay,
        "dualgate v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    metrics::init_metrics();

    let status_page = format!(
        "<html><body><h1>{}</h1><p>dualgate v{}</p></body></html>",
        escape_html(&config.hostname),
        env!("CARGO_PKG_VERSION")
    );
    let registry = RouteRegistry::new()
        .public("/", get(move || async move { Html(status_page) }))
        .public("/healthz", get(|| async { "ok" }));

    let overlay = Arc::new(HostOverlay::new(config.overlay.clone()));
    let server = DualSurfaceServer::new(config, registry, overlay);
    tokio::spawn(shutdown_on_ctrl_c(server.shutdown_handle()));

    match server.run().await {
        Ok(reason) => {
            tracing::info!(reason = ?reason, "Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
