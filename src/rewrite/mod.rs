//! Response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream response (Content-Type, Content-Encoding, body)
//!     → interceptor.rs (media type + path, short-circuit on no match)
//!     → matcher.rs (eligible groups, configuration order)
//!     → codec.rs (decode body with the response's encoding)
//!     → engine.rs (ordered replace-all over the decoded bytes)
//!     → codec.rs (re-encode with the same encoding)
//!     → interceptor.rs (swap body, recompute Content-Length)
//!
//! Rule Compilation (at startup):
//!     substitution file (JSON)
//!     → rules.rs (deserialize, compile every pattern)
//!     → Substitutions (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once at load; a bad pattern fails the whole load
//! - Body read only when at least one group applies
//! - Encoding preserved: a gzip response stays gzip
//! - Fully buffered; no streaming rewrite

pub mod codec;
pub mod engine;
pub mod interceptor;
pub mod matcher;
pub mod rules;

pub use codec::{CodecError, ContentEncoding};
pub use interceptor::{RewriteError, ResponseInterceptor};
pub use rules::{RuleError, SubstGroup, SubstItem, SubstItems, Substitutions};
