//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits so a config can be dumped or built from
//! structured input as well as from the command line.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the rewriting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream target and Host handling.
    pub upstream: UpstreamConfig,

    /// Rewriting settings.
    pub rewrite: RewriteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000" or ":8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

impl ListenerConfig {
    /// Parse the bind address. A bare `:port` binds all interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let addr = self.bind_address.trim();
        if addr.starts_with(':') {
            format!("0.0.0.0{addr}").parse()
        } else {
            addr.parse()
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Target URL (e.g., "http://127.0.0.1:3000/base").
    pub target: String,

    /// Explicit `Host` header sent upstream.
    pub host: Option<String>,

    /// Forward the client's `Host` header instead of the target's.
    pub preserve_host: bool,
}

impl UpstreamConfig {
    /// The `Host` value to force on upstream requests, if any.
    ///
    /// An explicit host always wins. Otherwise the target's authority is
    /// used, unless the client's Host is to be preserved.
    pub fn host_override(&self) -> Option<String> {
        if let Some(host) = &self.host {
            return Some(host.clone());
        }
        if self.preserve_host {
            return None;
        }
        let url = url::Url::parse(&self.target).ok()?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

/// Rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Path to the substitution rules (JSON).
    pub substitutions_path: Option<PathBuf>,

    /// Largest upstream body buffered for rewriting, in bytes.
    pub max_body_size: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            substitutions_path: None,
            max_body_size: 32 * 1024 * 1024, // 32MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Emit an access log line per rewritten response.
    pub access_log: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus endpoint bind address; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            access_log: false,
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
