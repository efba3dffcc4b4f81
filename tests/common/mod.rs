//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use rewrite_proxy::config::ProxyConfig;
use rewrite_proxy::http::HttpServer;
use rewrite_proxy::lifecycle::Shutdown;
use rewrite_proxy::Substitutions;

/// Request line and headers as seen by the mock upstream.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response returned by the mock upstream.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), content_type.into())],
            body: body.into(),
        }
    }

    #[allow(dead_code)]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Start a programmable mock upstream. Every connection serves exactly one
/// request and is then closed.
pub async fn start_upstream<F>(addr: SocketAddr, f: F)
where
    F: Fn(RequestHead) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (read, mut write) = socket.into_split();
                        let mut reader = BufReader::new(read);

                        let mut line = String::new();
                        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                            return;
                        }
                        let mut parts = line.split_whitespace();
                        let method = parts.next().unwrap_or_default().to_string();
                        let target = parts.next().unwrap_or_default().to_string();

                        let mut headers = Vec::new();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                                break;
                            }
                            let line = line.trim_end();
                            if line.is_empty() {
                                break;
                            }
                            if let Some((k, v)) = line.split_once(':') {
                                headers.push((k.trim().to_string(), v.trim().to_string()));
                            }
                        }

                        let response = f(RequestHead { method, target, headers });

                        let mut head = format!("HTTP/1.1 {} Mock\r\n", response.status);
                        for (k, v) in &response.headers {
                            head.push_str(&format!("{k}: {v}\r\n"));
                        }
                        head.push_str(&format!(
                            "Content-Length: {}\r\nConnection: close\r\n\r\n",
                            response.body.len()
                        ));

                        let _ = write.write_all(head.as_bytes()).await;
                        let _ = write.write_all(&response.body).await;
                        let _ = write.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start the proxy in front of `upstream` with the given rules.
pub async fn start_proxy(
    proxy_addr: SocketAddr,
    upstream: SocketAddr,
    rules: &str,
    configure: impl FnOnce(&mut ProxyConfig),
) -> Shutdown {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.upstream.target = format!("http://{upstream}");
    configure(&mut config);

    let substitutions = Substitutions::from_json(rules).unwrap();
    let server = HttpServer::new(config, substitutions).unwrap();
    let listener = TcpListener::bind(proxy_addr).await.unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// A client that neither pools connections nor uses system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
