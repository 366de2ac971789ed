//! Cookie middleware
//!
//! Parses the `Cookie` header into a [`CookieJar`] stored in the request
//! context under `cookies`, and serializes cookies for `Set-Cookie`.

use super::Middleware;
use crate::{Request, Response, Result};
use futures_util::future::BoxFuture;
use std::collections::HashMap;

/// Context key the jar is stored under
pub const COOKIES_KEY: &str = "cookies";

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// HTTP Cookie
#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Serialize to Set-Cookie header value
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if let Some(ref path) = self.path {
            parts.push(format!("Path={}", path));
        }
        if let Some(ref domain) = self.domain {
            parts.push(format!("Domain={}", domain));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={}", same_site.as_str()));
        }

        parts.join("; ")
    }

    /// Add a `Set-Cookie` header for this cookie; earlier cookies are kept
    pub fn apply(&self, res: &mut Response) {
        res.append_header("Set-Cookie", self.to_header_value());
    }

    /// Create a deletion cookie (max-age=0)
    pub fn delete(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0)
    }
}

/// Cookies sent by the client
#[derive(Debug, Default, Clone)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse cookies from Cookie header
    pub fn parse(header: &str) -> Self {
        let mut jar = Self::new();

        for part in header.split(';') {
            if let Some((name, value)) = part.trim().split_once('=') {
                jar.cookies.insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        jar
    }

    /// Get cookie value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|s| s.as_str())
    }

    /// Check if jar has a cookie
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Get all cookie names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.keys().map(|s| s.as_str())
    }
}

/// Cookie middleware - parses cookies into the request context
#[derive(Debug, Default, Clone, Copy)]
pub struct Cookies;

impl Cookies {
    pub fn new() -> Self {
        Self
    }

    /// Jar previously stored by this middleware
    pub fn get(req: &Request) -> Option<&CookieJar> {
        req.context().get::<CookieJar>(COOKIES_KEY)
    }
}

impl Middleware for Cookies {
    fn handle<'a>(&'a self, req: &'a mut Request, _res: &'a mut Response) -> BoxFuture<'a, Result<()>> {
        let jar = req.header("cookie").map(CookieJar::parse).unwrap_or_default();
        req.context_mut().insert(COOKIES_KEY, jar);
        Box::pin(std::future::ready(Ok(())))
    }
}
