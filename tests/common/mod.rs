//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use prequal_proxy::balancer::backend::Backend;
use prequal_proxy::balancer::registry::Registry;
use prequal_proxy::balancer::stats::Stats;
use prequal_proxy::balancer::{selector_from_config, Selector};
use prequal_proxy::config::ProxyConfig;
use prequal_proxy::lifecycle::Shutdown;
use prequal_proxy::observability::{MetricsSink, PrometheusSink};
use prequal_proxy::probe::Prober;
use prequal_proxy::proxy::HttpServer;

/// Handle to a spawned mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MockBackend {
    /// Stop accepting. New connections to the address are refused.
    #[allow(dead_code)]
    pub fn stop(&self) {
        self.task.abort();
    }
}

/// Start a mock backend that answers every request with 200 and a fixed body.
#[allow(dead_code)]
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move || async move { (200, body.to_string()) }).await
}

/// Start a mock backend whose status and body come from a closure.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    let task = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let f = f.clone();
            tokio::spawn(async move {
                let _ = read_request(&mut socket).await;
                let (status, body) = f().await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend { addr, task }
}

/// Start a mock backend that echoes the request body back.
#[allow(dead_code)]
pub async fn start_echo_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let body = read_request(&mut socket).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend { addr, task }
}

/// Read one HTTP request off the socket and return its body.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return Vec::new(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let content_length = std::str::from_utf8(&buf[..header_end])
        .ok()
        .and_then(|head| {
            head.lines().find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    buf[header_end..].to_vec()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Handle to a proxy spawned with its full stack (prober included).
#[allow(dead_code)]
pub struct ProxyHandle {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    pub stats: Arc<Stats>,
    pub shutdown: Shutdown,
}

/// Spawn the balancer with the given configuration on an ephemeral port.
pub async fn spawn_proxy(config: ProxyConfig) -> ProxyHandle {
    let registry = Arc::new(Registry::new());
    for server in &config.servers {
        registry
            .add(Backend::new(&server.id, &server.address))
            .unwrap();
    }

    let stats = Arc::new(Stats::default());
    let sink: Arc<dyn MetricsSink> = Arc::new(PrometheusSink);
    let selector: Arc<dyn Selector> = selector_from_config(&config);
    let shutdown = Shutdown::new();

    let prober = Arc::new(Prober::new(registry.clone(), sink.clone(), &config).unwrap());
    tokio::spawn(prober.run(shutdown.subscribe()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, registry.clone(), selector, stats.clone(), sink);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    ProxyHandle {
        addr,
        registry,
        stats,
        shutdown,
    }
}

/// A client that ignores any proxy environment variables.
#[allow(dead_code)]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
