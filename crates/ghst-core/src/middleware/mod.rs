//! Middleware
//!
//! Every middleware runs for every request, matched or not, in registration
//! order, before the route handler or the 404 handler. Each one completes
//! before the next starts. An error stops the chain and fails the request.

pub mod content_type;
pub mod cookie;
pub mod json_body;
pub mod logger;

pub use content_type::{content_type, html, ContentType};
pub use cookie::{Cookie, CookieJar, Cookies, SameSite};
pub use json_body::JsonBody;
pub use logger::{generate_request_id, Logger};

use crate::{Request, Response, Result};
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Middleware trait - runs before the handler
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>>;
}

/// Adapter for synchronous middleware closures
pub struct MiddlewareFn<F>(pub F);

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(&mut Request, &mut Response) -> Result<()> + Send + Sync + 'static,
{
    fn handle<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        Box::pin(std::future::ready((self.0)(req, res)))
    }
}

/// Wrap a synchronous closure as middleware
pub fn from_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(&mut Request, &mut Response) -> Result<()> + Send + Sync + 'static,
{
    MiddlewareFn(f)
}

/// Middleware chain
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn add_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run every middleware in order, stopping at the first error
    pub async fn run(&self, req: &mut Request, res: &mut Response) -> Result<()> {
        for m in &self.middlewares {
            m.handle(req, res).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}
