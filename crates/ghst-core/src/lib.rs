//! ghst-core: minimal HTTP routing framework
//!
//! Exact-path routes, an ordered middleware chain, request/response
//! wrappers and a hyper-based server.
//!
//! ## Example
//! ```no_run
//! use ghst_core::{middleware, App, AppOptions, Method, ServerConfig};
//!
//! # async fn run() -> ghst_core::Result<()> {
//! let mut app = App::with_options(AppOptions::new().middleware(middleware::html()));
//! app.on_request("/", Method::Get, |req, res| {
//!     res.send(format!("<h1>{}</h1>", req.path()));
//!     Ok(())
//! });
//!
//! app.listen(ServerConfig::new(8080), |addr| println!("listening on {}", addr))
//!     .await
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod app;
pub mod context;
pub mod error;
pub mod handlers;
pub mod method;
pub mod middleware;
pub mod mime;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod template;

// Re-exports
pub use app::{App, AppOptions};
pub use context::Context;
pub use error::{Error, Result};
pub use handlers::{Handler, HandlerFn, NotFound, StaticFile};
pub use method::Method;
pub use middleware::{Middleware, MiddlewareChain};
pub use request::{parse_query, split_target, Request, RequestBuilder};
pub use response::{Response, StatusCode};
pub use router::{Route, Routes};
pub use server::{ConnectionTracker, Server, ServerConfig};
