//! Application: route table, middleware chain and 404 fallback
//!
//! Routes and middleware are registered before the application is bound;
//! binding consumes it, so both are read-only while serving.

use crate::handlers::{self, Handler, NotFound, StaticFile};
use crate::middleware::{self, Middleware, MiddlewareChain};
use crate::response::Responder;
use crate::router::Routes;
use crate::{Method, Request, Response, Result, StatusCode};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Construction-time application options
#[derive(Clone, Default)]
pub struct AppOptions {
    pub middleware: MiddlewareChain,
    pub on_404: Option<Arc<dyn Handler>>,
}

impl AppOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.add(middleware);
        self
    }

    /// Append a synchronous middleware closure
    pub fn middleware_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> Result<()> + Send + Sync + 'static,
    {
        self.middleware(middleware::from_fn(f))
    }

    /// Replace the default 404 handler
    pub fn on_404<F>(self, f: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> Result<()> + Send + Sync + 'static,
    {
        self.on_404_handler(handlers::from_fn(f))
    }

    pub fn on_404_handler<H: Handler>(mut self, handler: H) -> Self {
        self.on_404 = Some(Arc::new(handler));
        self
    }
}

/// HTTP application
pub struct App {
    routes: Routes<Arc<dyn Handler>>,
    middleware: MiddlewareChain,
    not_found: Arc<dyn Handler>,
}

impl App {
    /// Create an application with no middleware and the default 404 handler
    pub fn new() -> Self {
        Self::with_options(AppOptions::default())
    }

    pub fn with_options(options: AppOptions) -> Self {
        Self {
            routes: Routes::new(),
            middleware: options.middleware,
            not_found: options.on_404.unwrap_or_else(|| Arc::new(NotFound)),
        }
    }

    /// Register a route; a later registration for the same path replaces it
    pub fn on_request<F>(&mut self, path: impl Into<String>, method: Method, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> Result<()> + Send + Sync + 'static,
    {
        self.on_request_with(path, method, handlers::from_fn(handler))
    }

    /// Register a route with a [`Handler`] implementation
    pub fn on_request_with<H: Handler>(&mut self, path: impl Into<String>, method: Method, handler: H) -> &mut Self {
        let path = path.into();
        tracing::debug!(%method, path = %path, "route registered");
        self.routes.insert(path, method, Arc::new(handler));
        self
    }

    /// Append a middleware
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.add(middleware);
        self
    }

    /// Append a synchronous middleware closure
    pub fn use_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Request, &mut Response) -> Result<()> + Send + Sync + 'static,
    {
        self.use_middleware(middleware::from_fn(f))
    }

    /// Register a `GET` route for every file under `dir`
    pub fn set_static(&mut self, dir: impl AsRef<Path>) -> Result<&mut Self> {
        let files = handlers::collect_files(dir.as_ref())?;
        tracing::info!(dir = %dir.as_ref().display(), files = files.len(), "static directory registered");

        for (route, file) in files {
            self.on_request_with(route, Method::Get, StaticFile::new(file));
        }
        Ok(self)
    }

    pub fn routes(&self) -> &Routes<Arc<dyn Handler>> {
        &self.routes
    }

    /// Run one request to its terminal send
    ///
    /// A middleware or handler error replaces the response with a 500
    /// unless it was already sent.
    pub async fn handle(&self, req: Request, mut res: Response) {
        let method = req.method().to_string();
        let path = req.path().to_string();

        if let Err(e) = self.dispatch(req, &mut res).await {
            tracing::error!(%method, %path, error = %e, "request failed");
            res.fail();
        }
        res.end();
    }

    /// Like [`App::handle`], but the pipeline is dropped once `deadline`
    /// passes
    ///
    /// An unsent response becomes `504 Gateway Timeout`. A handler that
    /// keeps running after its terminal send is cancelled at the same
    /// deadline.
    pub async fn handle_within(&self, req: Request, mut res: Response, deadline: Duration) {
        let method = req.method().to_string();
        let path = req.path().to_string();

        match tokio::time::timeout(deadline, self.dispatch(req, &mut res)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(%method, %path, error = %e, "request failed");
                res.fail();
            }
            Err(_) if res.is_ended() => {
                tracing::debug!(%method, %path, ?deadline, "cancelled after response was sent");
            }
            Err(_) => {
                tracing::warn!(%method, %path, ?deadline, "request timed out");
                res.fail_with(StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout");
            }
        }
        res.end();
    }

    /// Run a request through the application without a server
    pub async fn respond(&self, req: Request) -> http::Response<Bytes> {
        let (tx, rx): (Responder, _) = oneshot::channel();
        self.handle(req, Response::with_responder(tx)).await;

        match rx.await {
            Ok(res) => res,
            Err(_) => {
                let mut res = http::Response::new(Bytes::from_static(b"Internal Server Error"));
                *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }

    async fn dispatch(&self, mut req: Request, res: &mut Response) -> Result<()> {
        let route = self.routes.find(req.path(), req.method()).cloned();

        self.middleware.run(&mut req, res).await?;

        match route {
            Some(handler) => handler.call(&req, res).await,
            None => {
                res.force_status(StatusCode::NOT_FOUND);
                self.not_found.call(&req, res).await
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
