//! JSON body middleware
//!
//! Parses `application/json` bodies once, up front, and stores the outcome
//! in the request context under `json` as `Result<serde_json::Value>`.
//! Requests with another content type get no entry.

use super::Middleware;
use crate::{Request, Response, Result};
use futures_util::future::BoxFuture;

/// Context key the parsed body is stored under
pub const JSON_KEY: &str = "json";

/// JSON body parsing middleware
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBody;

impl JsonBody {
    pub fn new() -> Self {
        Self
    }

    /// Parsed body previously stored by this middleware
    pub fn get(req: &Request) -> Option<&Result<serde_json::Value>> {
        req.context().get::<Result<serde_json::Value>>(JSON_KEY)
    }
}

impl Middleware for JsonBody {
    fn handle<'a>(&'a self, req: &'a mut Request, _res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        let is_json = req
            .content_type()
            .map(|ct| ct.split(';').next().unwrap_or_default().trim())
            .is_some_and(|ct| ct.eq_ignore_ascii_case("application/json"));

        if is_json {
            let parsed = req.parse_body();
            req.context_mut().insert(JSON_KEY, parsed);
        }
        Box::pin(std::future::ready(Ok(())))
    }
}
