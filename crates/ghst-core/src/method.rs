//! HTTP Method enum
//!
//! The nine verbs a route may be registered for. Matching is exact and
//! case-sensitive; anything else never reaches a route handler.

use crate::{Error, Result};
use std::str::FromStr;

/// HTTP Method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl Method {
    /// Parse method from wire bytes (case-sensitive)
    #[inline]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes.first()? {
            b'G' if bytes == b"GET" => Some(Method::Get),
            b'P' => match bytes {
                b"POST" => Some(Method::Post),
                b"PUT" => Some(Method::Put),
                b"PATCH" => Some(Method::Patch),
                _ => None,
            },
            b'D' if bytes == b"DELETE" => Some(Method::Delete),
            b'H' if bytes == b"HEAD" => Some(Method::Head),
            b'O' if bytes == b"OPTIONS" => Some(Method::Options),
            b'C' if bytes == b"CONNECT" => Some(Method::Connect),
            b'T' if bytes == b"TRACE" => Some(Method::Trace),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Method::parse(s.as_bytes()).ok_or_else(|| Error::InvalidMethod(s.to_string()))
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
