//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, access log)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging via `tracing`
//! - Request ID flows through logs and upstream requests
//! - Metrics are cheap (no-op until an exporter is installed)

pub mod logging;
pub mod metrics;
