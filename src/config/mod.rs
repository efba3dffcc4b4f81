//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line / environment
//!     → schema.rs (ProxyConfig with defaults)
//!     → validation.rs (semantic checks)
//!
//! substitution file (JSON)
//!     → loader.rs (read & compile rules)
//!     → Substitutions (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Any load or validation error is fatal before the listener starts

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_substitutions, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, ProxyConfig, RewriteConfig, TimeoutConfig,
    UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
