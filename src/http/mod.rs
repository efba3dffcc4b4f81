//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → headers.rs (strip hop-by-hop, X-Forwarded-For)
//!     → director.rs (upstream URI, Host override)
//!     → upstream via hyper client
//!     → rewrite::interceptor (body substitution)
//!     → Send to client
//! ```

pub mod director;
pub mod headers;
pub mod request;
pub mod server;

pub use director::Director;
pub use request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
