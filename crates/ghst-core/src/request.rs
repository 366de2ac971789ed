//! HTTP Request wrapper
//!
//! A read-only snapshot of one inbound request. Path, query and headers are
//! derived once at construction; the body is buffered by the server before
//! the wrapper is built.

use crate::{Context, Method, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;

/// HTTP Request
#[derive(Debug)]
pub struct Request {
    method: String,
    url: String,
    path: String,
    query: String,
    query_params: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Bytes,
    context: Context,
}

impl Request {
    /// Create a request from a method and a request target
    ///
    /// The target may be an absolute URL or origin-form (`/path?query`).
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let (path, query) = split_target(&url);
        let query_params = parse_query(&query);

        Self {
            method: method.into(),
            url,
            path,
            query,
            query_params,
            headers: HashMap::new(),
            body: Bytes::new(),
            context: Context::new(),
        }
    }

    /// Raw method text as received
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Method as a known verb, if it is one
    pub fn verb(&self) -> Option<Method> {
        Method::parse(self.method.as_bytes())
    }

    /// Request target as received
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Routable path, always starting with `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string (without leading `?`, possibly empty)
    pub fn query_string(&self) -> &str {
        &self.query
    }

    /// Parsed query mapping
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Get a query value
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// All headers, names as provided by the transport
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.headers.get(name) {
            return Some(v.as_str());
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get content-type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Buffered body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8 text; empty when there is no body
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parse the body as JSON
    pub fn parse_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserialize the body as JSON into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Values contributed by middleware
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Check whether middleware attached an entry with this name
    pub fn has(&self, name: &str) -> bool {
        self.context.has(name)
    }
}

/// Builder for constructing requests
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, url),
        }
    }

    /// Add a header; a repeated name replaces the earlier value
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name.into(), value.into());
        self
    }

    /// Add every header from an iterator
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in headers {
            self.request.headers.insert(k.into(), v.into());
        }
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

/// Split a request target into its routable path and raw query string
///
/// For absolute URLs the scheme and authority (the first three
/// `/`-delimited segments) are discarded. The path is re-prefixed with `/`.
pub fn split_target(url: &str) -> (String, String) {
    let (target, query) = match url.split_once('?') {
        Some((t, q)) => (t, q),
        None => (url, ""),
    };

    let path = if target.contains("://") {
        target.splitn(4, '/').nth(3).unwrap_or("")
    } else {
        target.strip_prefix('/').unwrap_or(target)
    };

    (format!("/{}", path), query.to_string())
}

/// Parse a raw query string into a mapping
///
/// Pairs split on `&`, then on `=`. Only the text between the first and
/// second `=` is kept as the value, so `a=x=y` yields `a -> x`. The last
/// duplicate key wins and values are not URL-decoded.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let mut parts = pair.split('=');
        let key = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();
        params.insert(key.to_string(), value.to_string());
    }
    params
}
