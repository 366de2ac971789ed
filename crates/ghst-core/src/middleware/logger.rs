//! Request logging middleware
//!
//! Tags each request with an id (reusing the client's `X-Request-ID` when
//! present), echoes it on the response and logs the request line.

use super::Middleware;
use crate::{Request, Response, Result};
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Context key the request id is stored under
pub const REQUEST_ID_KEY: &str = "request_id";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a 16 hex digit request id, unique within the process
pub fn generate_request_id() -> String {
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    // xorshift over the clock, then the counter keeps ids distinct
    let mut seed = nanos | 1;
    seed ^= seed << 13;
    seed ^= seed >> 7;
    seed ^= seed << 17;
    format!("{:08x}{:08x}", (seed >> 32) as u32, count as u32)
}

/// Request logging middleware
#[derive(Debug, Clone)]
pub struct Logger {
    header_name: String,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            header_name: "X-Request-ID".to_string(),
        }
    }

    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Id previously stored by this middleware
    pub fn request_id(req: &Request) -> Option<&str> {
        req.context().get::<String>(REQUEST_ID_KEY).map(|s| s.as_str())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for Logger {
    fn handle<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        let id = req
            .header(&self.header_name)
            .map(|s| s.to_string())
            .unwrap_or_else(generate_request_id);

        tracing::info!(
            request_id = %id,
            method = req.method(),
            path = req.path(),
            query = req.query_string(),
            "request"
        );

        res.set_header(self.header_name.as_str(), id.as_str());
        req.context_mut().insert(REQUEST_ID_KEY, id);
        Box::pin(std::future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestBuilder;

    #[test]
    fn test_request_id_format() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_generates_and_echoes_id() {
        let mut req = RequestBuilder::new("GET", "/").build();
        let mut res = Response::new();
        Logger::new().handle(&mut req, &mut res).await.unwrap();

        let id = Logger::request_id(&req).unwrap();
        assert_eq!(res.header("x-request-id"), Some(id));
    }

    #[tokio::test]
    async fn test_reuses_client_id() {
        let mut req = RequestBuilder::new("GET", "/")
            .header("x-request-id", "abc")
            .build();
        let mut res = Response::new();
        Logger::new().handle(&mut req, &mut res).await.unwrap();

        assert_eq!(Logger::request_id(&req), Some("abc"));
        assert_eq!(res.header("X-Request-ID"), Some("abc"));
    }
}
