//! Response interception and rewriting.
//!
//! # Responsibilities
//! - Read the response's media type and encoding
//! - Skip everything when no group applies (before touching the body)
//! - Decode, rewrite, re-encode with the same encoding
//! - Replace the body and recompute `Content-Length`
//! - Record rewrite duration (metrics, optional access log)

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use thiserror::Error;

use crate::observability::{logging, metrics};
use crate::rewrite::codec::{CodecError, ContentEncoding};
use crate::rewrite::engine;
use crate::rewrite::rules::Substitutions;

/// Error raised while rewriting a single response.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// Reading the upstream body failed or exceeded the size limit.
    #[error("failed to read upstream body: {0}")]
    Body(#[source] axum::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Rewrites upstream responses according to the loaded substitutions.
#[derive(Debug, Clone)]
pub struct ResponseInterceptor {
    substitutions: Arc<Substitutions>,
    max_body_size: usize,
    access_log: bool,
}

impl ResponseInterceptor {
    pub fn new(substitutions: Arc<Substitutions>, max_body_size: usize, access_log: bool) -> Self {
        Self {
            substitutions,
            max_body_size,
            access_log,
        }
    }

    /// Rewrite `response`, served for request `path`.
    ///
    /// Responses that no group applies to are returned untouched, with the
    /// body still unread.
    pub async fn intercept(
        &self,
        path: &str,
        response: Response<Body>,
    ) -> Result<Response<Body>, RewriteError> {
        if !has_body(response.status()) {
            return Ok(response);
        }

        let Some(media_type) = media_type(response.headers()) else {
            return Ok(response);
        };

        let groups = self.substitutions.matching(&media_type, path);
        if groups.is_empty() {
            return Ok(response);
        }

        let start = Instant::now();
        let encoding = ContentEncoding::from_headers(response.headers());

        let (mut parts, body) = response.into_parts();
        let raw = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(RewriteError::Body)?;
        if raw.is_empty() {
            return Ok(Response::from_parts(parts, Body::from(raw)));
        }
        let original_size = raw.len();

        let decoded = encoding.decode(raw)?;
        let rewritten = engine::apply(&groups, decoded.to_vec());
        let encoded = encoding.encode(rewritten)?;
        let rewritten_size = encoded.len();

        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten_size));
        parts.headers.remove(header::TRANSFER_ENCODING);

        metrics::record_rewrite(encoding, start);
        if self.access_log {
            logging::log_rewrite(path, encoding, original_size, rewritten_size, start.elapsed());
        }

        Ok(Response::from_parts(parts, Body::from(encoded)))
    }
}

/// The lowercased `type/subtype` of the `Content-Type` header, without
/// parameters. `None` when the header is missing or unparseable.
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime: mime::Mime = value.trim().parse().ok()?;
    Some(mime.essence_str().to_ascii_lowercase())
}

fn has_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn interceptor(json: &str) -> ResponseInterceptor {
        ResponseInterceptor::new(
            Arc::new(Substitutions::from_json(json).unwrap()),
            1024 * 1024,
            false,
        )
    }

    fn yen() -> ResponseInterceptor {
        interceptor(
            r#"[{"path": "^/001/[^/]*\\.html$", "items": [{"src": "This is (\\d+) YEN", "rep": "これは $1 円です"}]}]"#,
        )
    }

    fn response(content_type: Option<&str>, encoding: Option<&str>, body: impl Into<Bytes>) -> Response<Body> {
        let body: Bytes = body.into();
        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, body.len());
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        if let Some(ce) = encoding {
            builder = builder.header(header::CONTENT_ENCODING, ce);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn body_bytes(response: Response<Body>) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[test]
    fn test_media_type_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(media_type(&headers), None);

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        assert_eq!(media_type(&headers).as_deref(), Some("text/html"));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("Text/HTML"));
        assert_eq!(media_type(&headers).as_deref(), Some("text/html"));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("not a media type"));
        assert_eq!(media_type(&headers), None);
    }

    #[tokio::test]
    async fn test_rewrites_matching_response() {
        let res = response(Some("text/html; charset=utf-8"), None, "This is 1234 YEN");
        let out = yen().intercept("/001/abc.html", res).await.unwrap();

        let expected = "これは 1234 円です";
        assert_eq!(
            out.headers()[header::CONTENT_LENGTH],
            expected.len().to_string().as_str()
        );
        assert_eq!(out.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(body_bytes(out).await, expected.as_bytes());
    }

    #[tokio::test]
    async fn test_non_matching_path_passes_through() {
        let res = response(Some("text/html"), None, "This is 1234 YEN");
        let out = yen().intercept("/002/abc.html", res).await.unwrap();
        assert_eq!(out.headers()[header::CONTENT_LENGTH], "16");
        assert_eq!(body_bytes(out).await, "This is 1234 YEN".as_bytes());
    }

    #[tokio::test]
    async fn test_unparseable_media_type_passes_through() {
        let res = response(Some("garbage"), None, "This is 1 YEN");
        let out = yen().intercept("/001/abc.html", res).await.unwrap();
        assert_eq!(body_bytes(out).await, "This is 1 YEN".as_bytes());

        let res = response(None, None, "This is 1 YEN");
        let out = yen().intercept("/001/abc.html", res).await.unwrap();
        assert_eq!(body_bytes(out).await, "This is 1 YEN".as_bytes());
    }

    #[tokio::test]
    async fn test_no_match_does_not_decode() {
        // Corrupt gzip is never touched when nothing applies.
        let res = response(Some("text/html"), Some("gzip"), "not gzip");
        let out = yen().intercept("/elsewhere.html", res).await.unwrap();
        assert_eq!(out.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(body_bytes(out).await, "not gzip".as_bytes());
    }

    #[tokio::test]
    async fn test_gzip_encoding_preserved() {
        let compressed = ContentEncoding::Gzip
            .encode(b"This is 42 YEN".to_vec())
            .unwrap();
        let res = response(Some("text/html"), Some("gzip"), compressed);
        let out = yen().intercept("/001/x.html", res).await.unwrap();

        assert_eq!(out.headers()[header::CONTENT_ENCODING], "gzip");
        let length: usize = out.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let body = body_bytes(out).await;
        assert_eq!(length, body.len());

        let plain = ContentEncoding::Gzip.decode(body).unwrap();
        assert_eq!(plain, "これは 42 円です".as_bytes());
    }

    #[tokio::test]
    async fn test_brotli_and_deflate_preserved() {
        for (encoding, label) in [(ContentEncoding::Brotli, "br"), (ContentEncoding::Deflate, "deflate")] {
            let compressed = encoding.encode(b"This is 7 YEN".to_vec()).unwrap();
            let res = response(Some("text/html"), Some(label), compressed);
            let out = yen().intercept("/001/x.html", res).await.unwrap();
            let body = body_bytes(out).await;
            assert_eq!(encoding.decode(body).unwrap(), "これは 7 円です".as_bytes());
        }
    }

    #[tokio::test]
    async fn test_corrupt_body_is_an_error() {
        let res = response(Some("text/html"), Some("gzip"), "not gzip at all");
        let err = yen().intercept("/001/x.html", res).await.unwrap_err();
        assert!(matches!(
            err,
            RewriteError::Codec(CodecError::Decode { encoding: ContentEncoding::Gzip, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_encoding_treated_as_identity() {
        let res = response(Some("text/html"), Some("x-custom"), "This is 5 YEN");
        let out = yen().intercept("/001/x.html", res).await.unwrap();
        assert_eq!(out.headers()[header::CONTENT_ENCODING], "x-custom");
        assert_eq!(body_bytes(out).await, "これは 5 円です".as_bytes());
    }

    #[tokio::test]
    async fn test_body_limit_exceeded() {
        let interceptor = ResponseInterceptor::new(
            Arc::new(
                Substitutions::from_json(r#"[{"path": "", "items": [{"src": "a", "rep": "b"}]}]"#)
                    .unwrap(),
            ),
            8,
            false,
        );
        let res = response(Some("text/html"), None, "a".repeat(64));
        let err = interceptor.intercept("/", res).await.unwrap_err();
        assert!(matches!(err, RewriteError::Body(_)));
    }

    #[tokio::test]
    async fn test_no_content_skipped() {
        let res = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::empty())
            .unwrap();
        let out = yen().intercept("/001/x.html", res).await.unwrap();
        assert_eq!(out.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_empty_body_with_gzip_label_passes_through() {
        let res = response(Some("text/html"), Some("gzip"), Bytes::new());
        let out = yen().intercept("/001/x.html", res).await.unwrap();
        assert_eq!(out.headers()[header::CONTENT_LENGTH], "0");
        assert!(body_bytes(out).await.is_empty());
    }
}
