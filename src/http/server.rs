//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Forward requests to the upstream target
//! - Run the response interceptor on every upstream response

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{validate_config, ConfigError, ProxyConfig, ValidationError};
use crate::http::director::Director;
use crate::http::headers::{append_forwarded_for, remove_hop_by_hop};
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::observability::metrics;
use crate::rewrite::{ResponseInterceptor, Substitutions};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub director: Arc<Director>,
    pub interceptor: Arc<ResponseInterceptor>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and rules.
    ///
    /// The configuration is validated here; `substitutions` must already be
    /// fully compiled.
    pub fn new(config: ProxyConfig, substitutions: Substitutions) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let target = url::Url::parse(&config.upstream.target).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::InvalidTarget(
                config.upstream.target.clone(),
                e.to_string(),
            )])
        })?;
        let host_override = match config.upstream.host_override() {
            Some(host) => Some(HeaderValue::from_str(&host).map_err(|_| {
                ConfigError::Validation(vec![ValidationError::InvalidHost(host.clone())])
            })?),
            None => None,
        };
        let director = Director::new(&target, host_override).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::InvalidTarget(
                config.upstream.target.clone(),
                e.to_string(),
            )])
        })?;

        let interceptor = ResponseInterceptor::new(
            Arc::new(substitutions),
            config.rewrite.max_body_size,
            config.observability.access_log,
        );

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            director: Arc::new(director),
            interceptor: Arc::new(interceptor),
            client,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.target,
            "HTTP server starting"
        );
        if self.config.observability.access_log {
            tracing::info!(
                target: crate::observability::logging::ACCESS_LOG_TARGET,
                "reverse proxy is listening {}",
                addr
            );
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                wait_for_shutdown(shutdown).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Forwards the request upstream and rewrites the response.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let (mut parts, body) = request.into_parts();
    remove_hop_by_hop(&mut parts.headers);
    append_forwarded_for(&mut parts.headers, addr.ip());
    if let Err(e) = state.director.direct(&mut parts) {
        tracing::error!(request_id = %request_id, path = %path, error = %e, "Failed to build upstream request");
        metrics::record_request(method.as_str(), 502, start_time);
        return (StatusCode::BAD_GATEWAY, "Bad upstream request").into_response();
    }
    // Rules match the outbound path, base path included.
    let upstream_path = parts.uri.path().to_string();

    let upstream: hyper::Response<Incoming> = match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Upstream error");
            metrics::record_request(method.as_str(), 502, start_time);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let (mut parts, body) = upstream.into_parts();
    remove_hop_by_hop(&mut parts.headers);
    let response = Response::from_parts(parts, Body::new(body));

    if method == Method::HEAD {
        metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
        return response;
    }

    match state.interceptor.intercept(&upstream_path, response).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = %e, "Rewrite failed");
            metrics::record_rewrite_failure();
            metrics::record_request(method.as_str(), 502, start_time);
            (StatusCode::BAD_GATEWAY, "Response rewrite failed").into_response()
        }
    }
}
