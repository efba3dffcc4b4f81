//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Emit access log events for rewritten responses
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level
//! - Access log events use their own target so they survive a quieter level

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::rewrite::codec::ContentEncoding;

/// Target used for access log events.
pub const ACCESS_LOG_TARGET: &str = "rewrite_proxy::access";

/// Default filter directives for a log level.
pub fn default_directives(level: &str) -> String {
    format!("rewrite_proxy={level},tower_http={level},{ACCESS_LOG_TARGET}=info")
}

/// Initialize the global tracing subscriber.
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Access log entry for a rewritten response.
pub fn log_rewrite(
    path: &str,
    encoding: ContentEncoding,
    original_size: usize,
    rewritten_size: usize,
    elapsed: Duration,
) {
    tracing::info!(
        target: ACCESS_LOG_TARGET,
        path = %path,
        encoding = %encoding,
        original_size,
        rewritten_size,
        elapsed = ?elapsed,
        "rewrite {} in {:?}",
        path,
        elapsed
    );
}
