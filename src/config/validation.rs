//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream target (absolute http URL with a host)
//! - Validate value ranges (body limit > 0, timeout > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no upstream target; check --target or REVERSE_PROXY_TARGET_URL")]
    MissingTarget,

    #[error("invalid upstream target {0:?}: {1}")]
    InvalidTarget(String, String),

    #[error("unsupported upstream scheme {0:?} (only http is supported)")]
    UnsupportedScheme(String),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid host override {0:?}")]
    InvalidHost(String),

    #[error("max body size must be greater than zero")]
    ZeroBodyLimit,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target = config.upstream.target.trim();
    if target.is_empty() {
        errors.push(ValidationError::MissingTarget);
    } else {
        match url::Url::parse(target) {
            Ok(url) if url.scheme() != "http" => {
                errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
            }
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::InvalidTarget(
                    target.to_string(),
                    "missing host".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => {
                errors.push(ValidationError::InvalidTarget(target.to_string(), e.to_string()));
            }
        }
    }

    if config.listener.socket_addr().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(host) = &config.upstream.host {
        if host.is_empty() || HeaderValue::from_str(host).is_err() {
            errors.push(ValidationError::InvalidHost(host.clone()));
        }
    }

    if config.rewrite.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
