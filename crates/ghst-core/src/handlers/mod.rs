//! Request handlers
//!
//! The handler trait, the adapter for plain closures, the default 404
//! handler and static file serving.

pub mod static_files;

pub use static_files::{collect_files, StaticFile};

use crate::{Request, Response, Result};
use futures_util::future::BoxFuture;

/// Route handler trait
///
/// Implement this directly for handlers that need to await; plain closures
/// go through [`HandlerFn`].
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>>;
}

/// Adapter for synchronous handler closures
pub struct HandlerFn<F>(pub F);

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Request, &mut Response) -> Result<()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        Box::pin(std::future::ready((self.0)(req, res)))
    }
}

/// Wrap a synchronous closure as a handler
pub fn from_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&Request, &mut Response) -> Result<()> + Send + Sync + 'static,
{
    HandlerFn(f)
}

/// Default 404 handler: `Cannot <METHOD> <path>`
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

impl Handler for NotFound {
    fn call<'a>(&'a self, req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        if res.content_type().is_none() {
            res.set_header("Content-Type", "text/plain");
        }
        res.send(format!("Cannot {} {}", req.method(), req.path()));
        Box::pin(std::future::ready(Ok(())))
    }
}
