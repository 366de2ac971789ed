//! HTTP server
//!
//! One accept loop; every connection gets its own task driven by hyper's
//! HTTP/1.1 connection, so requests on a connection are handled in order
//! while connections run concurrently. Each request runs the application
//! in a separate task under a deadline. The task is cancelled when the
//! deadline passes or when the connection goes away before a response.

use crate::{App, Error, RequestBuilder, Response, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::AbortHandle;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub hostname: String,
    /// Deadline for a request to reach its terminal send
    pub request_timeout: Duration,
    /// Largest request body accepted, in bytes
    pub max_body_size: usize,
    /// How long shutdown waits for open connections
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "0.0.0.0".to_string(),
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.hostname.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| Error::Internal(format!("no address for {}:{}", self.hostname, self.port)))
    }
}

/// Create a listening TCP socket with SO_REUSEADDR set
pub fn create_listener(addr: &SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    TcpListener::from_std(socket.into())
}

/// Tracks active connections for graceful shutdown
#[derive(Debug)]
pub struct ConnectionTracker {
    active: AtomicU64,
    shutdown: watch::Sender<bool>,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            shutdown: watch::channel(false).0,
        }
    }

    /// Get current active connection count
    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Signal open connections to finish their current request and close
    pub fn start_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    fn open(self: &Arc<Self>) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard(self.clone())
    }
}

/// Decrements the active count when the connection task ends
struct ConnectionGuard(Arc<ConnectionTracker>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A bound server
pub struct Server {
    listener: TcpListener,
    app: Arc<App>,
    config: Arc<ServerConfig>,
    tracker: Arc<ConnectionTracker>,
}

impl App {
    /// Bind a listener for this application
    pub async fn bind(self, config: ServerConfig) -> Result<Server> {
        let addr = config.resolve().await?;
        let listener = create_listener(&addr)?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        Ok(Server {
            listener,
            app: Arc::new(self),
            config: Arc::new(config),
            tracker: Arc::new(ConnectionTracker::new()),
        })
    }

    /// Bind, call `on_ready` with the bound address, then serve forever
    pub async fn listen<F>(self, config: ServerConfig, on_ready: F) -> Result<()>
    where
        F: FnOnce(SocketAddr),
    {
        let server = self.bind(config).await?;
        on_ready(server.local_addr()?);
        server.run().await
    }
}

impl Server {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn tracker(&self) -> Arc<ConnectionTracker> {
        self.tracker.clone()
    }

    /// Serve until the process ends
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `signal` resolves, then drain open connections
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    self.spawn_connection(stream, peer);
                }
            }
        }

        drop(self.listener);
        self.tracker.start_shutdown();
        tracing::info!(active = self.tracker.count(), "shutting down");

        let tracker = self.tracker.clone();
        let drained = tokio::time::timeout(self.config.shutdown_timeout, async move {
            while tracker.count() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(active = self.tracker.count(), "shutdown timeout, closing open connections");
        }
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, error = %e, "set_nodelay failed");
        }

        let app = self.app.clone();
        let config = self.config.clone();
        let guard = self.tracker.open();
        let mut shutdown = self.tracker.subscribe();

        tokio::spawn(async move {
            let _guard = guard;
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle_request(app.clone(), config.clone(), req));

            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            let result = tokio::select! {
                res = conn.as_mut() => res,
                _ = shutdown_signalled(&mut shutdown) => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };

            if let Err(e) = result {
                if !e.is_incomplete_message() {
                    tracing::warn!(%peer, error = %e, "connection error");
                }
            }
        });
    }
}

async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn handle_request(
    app: Arc<App>,
    config: Arc<ServerConfig>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let method = parts.method.as_str().to_string();
    let target = parts.uri.to_string();

    let body = match read_body(body, config.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(%method, target = %target, error = %e, "request body rejected");
            let res = match e {
                Error::BodyTooLarge { .. } => plain(http::StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"),
                _ => plain(http::StatusCode::BAD_REQUEST, "Bad Request"),
            };
            return Ok(to_hyper_response(res));
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));
    let request = RequestBuilder::new(method.clone(), target)
        .headers(headers)
        .body(body)
        .build();
    let path = request.path().to_string();

    let (tx, rx) = oneshot::channel();
    let response = Response::with_responder(tx);
    let deadline = config.request_timeout;
    let task = tokio::spawn(async move { app.handle_within(request, response, deadline).await });
    // Aborts the pipeline if the connection drops this future first
    let mut pipeline = AbortOnDrop(Some(task.abort_handle()));

    let res = match rx.await {
        Ok(res) => {
            // A handler still running after its send is bounded by `deadline`
            pipeline.disarm();
            res
        }
        Err(_) => {
            tracing::error!(%method, path = %path, "request task ended without a response");
            plain(http::StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    };

    tracing::debug!(
        %method,
        path = %path,
        status = res.status().as_u16(),
        elapsed = ?started.elapsed(),
        "request handled"
    );
    Ok(to_hyper_response(res))
}

/// Aborts a spawned request pipeline unless disarmed
struct AbortOnDrop(Option<AbortHandle>);

impl AbortOnDrop {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Buffer a whole body, failing once it exceeds `limit` bytes
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(Error::BodyTooLarge { limit }),
        Err(e) => Err(Error::Hyper(e.to_string())),
    }
}

fn plain(status: http::StatusCode, body: &'static str) -> http::Response<Bytes> {
    let mut res = http::Response::new(Bytes::from_static(body.as_bytes()));
    *res.status_mut() = status;
    res.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    res
}

/// Convert a sent response into a hyper response
pub fn to_hyper_response(res: http::Response<Bytes>) -> hyper::Response<Full<Bytes>> {
    res.map(Full::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.hostname, "0.0.0.0");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new(8080)
            .hostname("127.0.0.1")
            .request_timeout(Duration::from_millis(250))
            .max_body_size(16);
        assert_eq!(config.port, 8080);
        assert_eq!(config.hostname, "127.0.0.1");
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.max_body_size, 16);
    }

    #[tokio::test]
    async fn test_create_listener_ephemeral_port() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = create_listener(&addr).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        let body = read_body(Full::new(Bytes::from_static(b"hello")), 5).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"hello"));

        let err = read_body(Full::new(Bytes::from_static(b"hello!")), 5).await.unwrap_err();
        assert!(matches!(err, Error::BodyTooLarge { limit: 5 }));
    }

    #[test]
    fn test_connection_tracker() {
        let tracker = Arc::new(ConnectionTracker::new());
        let a = tracker.open();
        let b = tracker.open();
        assert_eq!(tracker.count(), 2);
        drop(a);
        assert_eq!(tracker.count(), 1);
        drop(b);
        assert_eq!(tracker.count(), 0);

        assert!(!tracker.is_shutting_down());
        tracker.start_shutdown();
        assert!(tracker.is_shutting_down());
    }
}
