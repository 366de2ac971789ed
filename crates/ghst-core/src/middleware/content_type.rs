//! Content-Type middleware
//!
//! Sets one fixed `Content-Type` on every response. Handlers can still
//! override it.

use super::Middleware;
use crate::{Request, Response, Result};
use futures_util::future::BoxFuture;

/// Fixed content type middleware
#[derive(Debug, Clone)]
pub struct ContentType {
    mime: String,
}

impl ContentType {
    pub fn new(mime: impl Into<String>) -> Self {
        Self { mime: mime.into() }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }
}

impl Middleware for ContentType {
    fn handle<'a>(&'a self, _req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        res.set_header("Content-Type", self.mime.as_str());
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Set `Content-Type` to `mime` on every response
pub fn content_type(mime: impl Into<String>) -> ContentType {
    ContentType::new(mime)
}

/// Set `Content-Type: text/html` on every response
pub fn html() -> ContentType {
    ContentType::new("text/html")
}
