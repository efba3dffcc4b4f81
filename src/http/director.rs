//! Upstream request preparation.
//!
//! # Responsibilities
//! - Point the request at the upstream target (scheme, authority, path, query)
//! - Optionally force the `Host` header sent upstream
//!
//! # Design Decisions
//! - Base preparation mirrors a single-host reverse proxy: target path and
//!   request path are joined with exactly one slash, queries are joined
//!   with `&`
//! - Host override runs after base preparation and touches nothing else
//! - Never touches the response path

use std::str::FromStr;

use axum::http::request::Parts;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderValue, Uri, Version};
use url::Url;

/// Rewrites client requests into upstream requests.
#[derive(Debug, Clone)]
pub struct Director {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
    base_query: Option<String>,
    host_override: Option<HeaderValue>,
}

impl Director {
    /// Build a director for `target`. `host_override`, when set, replaces
    /// the outgoing `Host` header.
    pub fn new(target: &Url, host_override: Option<HeaderValue>) -> Result<Self, axum::http::Error> {
        let host = target.host_str().unwrap_or_default();
        let authority = match target.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: Scheme::from_str(target.scheme())?,
            authority: Authority::from_str(&authority)?,
            base_path: target.path().to_string(),
            base_query: target.query().filter(|q| !q.is_empty()).map(str::to_string),
            host_override,
        })
    }

    /// Prepare `parts` for sending upstream.
    pub fn direct(&self, parts: &mut Parts) -> Result<(), axum::http::Error> {
        self.prepare(parts)?;
        if let Some(host) = &self.host_override {
            parts.headers.insert(header::HOST, host.clone());
        }
        Ok(())
    }

    fn prepare(&self, parts: &mut Parts) -> Result<(), axum::http::Error> {
        let path = join_paths(&self.base_path, parts.uri.path());
        let query = match (self.base_query.as_deref(), parts.uri.query()) {
            (Some(base), Some(req)) if !req.is_empty() => Some(format!("{base}&{req}")),
            (Some(base), _) => Some(base.to_string()),
            (None, Some(req)) if !req.is_empty() => Some(req.to_string()),
            (None, _) => None,
        };
        let path_and_query = match query {
            Some(q) => PathAndQuery::from_str(&format!("{path}?{q}"))?,
            None => PathAndQuery::from_str(&path)?,
        };

        parts.uri = Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?;
        // The upstream client speaks HTTP/1.1 regardless of the inbound version.
        parts.version = Version::HTTP_11;
        Ok(())
    }
}

/// Join two paths with exactly one slash between them.
pub fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
