//! HTTP reverse proxy that rewrites upstream response bodies with
//! configurable text/regex substitution rules.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rewrite::Substitutions;
