//! Rewriting reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request           ┌──────────┐    ┌──────────┐
//!     ────────────────────────▶│  http    │───▶│ director │──────────▶ Upstream
//!                              │  server  │    └──────────┘
//!                              └──────────┘
//!                                                                    │
//!     Client Response          ┌──────────────────────────────────┐  │
//!     ◀────────────────────────│ rewrite::interceptor             │◀─┘
//!                              │  matcher → codec → engine → codec│
//!                              └──────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rewrite_proxy::config::{load_substitutions, validate_config, ProxyConfig};
use rewrite_proxy::http::HttpServer;
use rewrite_proxy::lifecycle::{signals, Shutdown};
use rewrite_proxy::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "rewrite-proxy")]
#[command(about = "Reverse proxy that rewrites upstream response bodies", long_about = None)]
struct Cli {
    /// Reverse proxy target URL.
    #[arg(long, env = "REVERSE_PROXY_TARGET_URL")]
    target: Option<String>,

    /// Reverse proxy server address and port.
    #[arg(long, default_value = ":8000")]
    addr: String,

    /// Output access log.
    #[arg(long)]
    accesslog: bool,

    /// Substitution rules file (JSON).
    #[arg(long, visible_alias = "messages")]
    substitutions: Option<PathBuf>,

    /// Host header sent upstream (defaults to the target's host).
    #[arg(long)]
    host: Option<String>,

    /// Forward the client's Host header unchanged.
    #[arg(long, conflicts_with = "host")]
    preserve_host: bool,

    /// Largest upstream body buffered for rewriting, in bytes.
    #[arg(long, default_value_t = 32 * 1024 * 1024)]
    max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Prometheus metrics listen address (disabled when unset).
    #[arg(long)]
    metrics_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = self.addr;
        config.upstream.target = self.target.unwrap_or_default();
        config.upstream.host = self.host;
        config.upstream.preserve_host = self.preserve_host;
        config.rewrite.substitutions_path = self.substitutions;
        config.rewrite.max_body_size = self.max_body_size;
        config.timeouts.request_secs = self.timeout;
        config.observability.access_log = self.accesslog;
        config.observability.log_level = self.log_level;
        config.observability.metrics_address = self.metrics_addr;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config();

    logging::init_logging(&config.observability.log_level);

    tracing::info!("rewrite-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(errors[0].to_string().into());
    }

    let Some(path) = config.rewrite.substitutions_path.clone() else {
        tracing::error!("No substitution rules; check --substitutions");
        return Err("no substitution rules; check --substitutions".into());
    };
    let substitutions = load_substitutions(&path).inspect_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to load substitutions");
    })?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.target,
        access_log = config.observability.access_log,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if let Some(addr) = &config.observability.metrics_address {
        metrics::init_metrics(addr.parse()?)?;
    }

    // Bind last: traffic is accepted only once rules are compiled.
    let bind_addr = config.listener.socket_addr()?;
    let server = HttpServer::new(config, substitutions)?;
    let listener = TcpListener::bind(bind_addr).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown));

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
