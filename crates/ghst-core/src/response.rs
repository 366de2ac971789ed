//! HTTP Response builder
//!
//! Accumulates status, headers and body through chained calls and performs
//! exactly one terminal send. Once terminated, every mutating call is a
//! no-op. Dropping an unterminated response sends nothing; the transport
//! sees the closed channel and answers 500.

use crate::{mime, template, Error, Result};
use bytes::Bytes;
use smallvec::SmallVec;
use std::path::Path;
use tokio::sync::oneshot;

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);

    pub const PERMANENT_REDIRECT: StatusCode = StatusCode(308);

    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const PAYLOAD_TOO_LARGE: StatusCode = StatusCode(413);

    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const GATEWAY_TIMEOUT: StatusCode = StatusCode(504);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Check if this is a success status (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Check if this is a redirect status (3xx)
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.0)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the transport receives on terminal send
pub(crate) type Responder = oneshot::Sender<http::Response<Bytes>>;

/// HTTP Response
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: SmallVec<[(String, String); 8]>,
    body: Bytes,
    /// Overrides `status` at terminal send (the 404 path)
    forced_status: Option<StatusCode>,
    ended: bool,
    responder: Option<Responder>,
}

impl Response {
    /// Create a detached response (200, no headers, empty body)
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: SmallVec::new(),
            body: Bytes::new(),
            forced_status: None,
            ended: false,
            responder: None,
        }
    }

    /// Create a response wired to a transport
    pub(crate) fn with_responder(responder: Responder) -> Self {
        Self {
            responder: Some(responder),
            ..Self::new()
        }
    }

    /// Replace the body
    pub fn send(&mut self, body: impl Into<Bytes>) -> &mut Self {
        if !self.ended {
            self.body = body.into();
        }
        self
    }

    /// Set a header; a later call for the same name (any case) overwrites
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if self.ended {
            return self;
        }
        let name = name.into();
        let value = value.into();
        let existing = self.headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(&name));
        match existing {
            Some(i) => self.headers[i] = (name, value),
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Add a header line without replacing earlier ones of the same name
    ///
    /// For headers that may repeat, such as `Set-Cookie`.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if !self.ended {
            self.headers.push((name.into(), value.into()));
        }
        self
    }

    /// Set the status code
    pub fn set_status(&mut self, code: u16) -> &mut Self {
        if !self.ended {
            self.status = StatusCode(code);
        }
        self
    }

    /// Send a file with its content type inferred from the extension
    ///
    /// Fails with [`Error::ContentTypeNotFound`] for extensions outside the
    /// MIME table. On failure the response is left untouched.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        let content_type = content_type_for(path)?;
        let contents = std::fs::read(path)?;

        self.set_header("Content-Type", content_type);
        Ok(self.send(contents))
    }

    /// Send a file after substituting its `{{ KEY }}` placeholders
    pub fn render<I, K, V>(&mut self, path: impl AsRef<Path>, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let path = path.as_ref();
        let content_type = content_type_for(path)?;
        let contents = std::fs::read(path)?;
        let text = String::from_utf8(contents)
            .map_err(|_| Error::Utf8(path.display().to_string()))?;

        self.set_header("Content-Type", content_type);
        Ok(self.send(template::render(&text, values)))
    }

    /// Permanent redirect; terminates the response
    pub fn redirect(&mut self, url: impl Into<String>) -> &mut Self {
        self.set_status(StatusCode::PERMANENT_REDIRECT.as_u16())
            .set_header("Location", url)
            .end();
        self
    }

    /// Terminal send. Only the first call has any effect.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        if let Some(responder) = self.responder.take() {
            // The receiver is gone when the request already timed out
            let _ = responder.send(self.to_http());
        }
    }

    /// Whether the terminal send happened
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Status that will be (or was) transmitted
    pub fn status(&self) -> StatusCode {
        self.forced_status.unwrap_or(self.status)
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get content-type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get body as string (if UTF-8)
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(|s| s.to_string())
    }

    pub(crate) fn force_status(&mut self, status: StatusCode) {
        if !self.ended {
            self.forced_status = Some(status);
        }
    }

    /// Replace whatever was accumulated with a 500 and terminate
    pub(crate) fn fail(&mut self) {
        self.fail_with(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }

    /// Replace whatever was accumulated with a plain-text error and terminate
    pub(crate) fn fail_with(&mut self, status: StatusCode, body: &'static str) {
        if self.ended {
            return;
        }
        self.headers.clear();
        self.headers.push(("Content-Type".to_string(), "text/plain".to_string()));
        self.forced_status = None;
        self.status = status;
        self.body = Bytes::from_static(body.as_bytes());
        self.end();
    }

    fn to_http(&self) -> http::Response<Bytes> {
        let mut builder = http::Response::builder().status(self.status().as_u16());
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match builder.body(self.body.clone()) {
            Ok(res) => res,
            Err(e) => {
                tracing::error!(error = %e, status = self.status().as_u16(), "invalid response");
                let mut res = http::Response::new(Bytes::from_static(b"Internal Server Error"));
                *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn content_type_for(path: &Path) -> Result<&'static str> {
    mime::from_path(path).ok_or_else(|| Error::ContentTypeNotFound(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let res = Response::new();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().is_empty());
        assert!(res.body().is_empty());
        assert!(!res.is_ended());
    }

    #[test]
    fn test_chained_setters_overwrite() {
        let mut res = Response::new();
        res.set_header("X", "a")
            .set_header("x", "b")
            .set_status(201)
            .send("first")
            .send("second");

        assert_eq!(res.header("X"), Some("b"));
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.body_string().as_deref(), Some("second"));
    }

    #[test]
    fn test_end_is_exactly_once() {
        let (tx, mut rx) = oneshot::channel();
        let mut res = Response::with_responder(tx);
        res.set_status(202).send("done");
        res.end();

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.status(), 202);
        assert_eq!(sent.body(), &Bytes::from_static(b"done"));

        res.end();
        res.send("again").set_status(500).set_header("X-Late", "1");
        assert_eq!(res.status(), StatusCode(202));
        assert_eq!(res.body_string().as_deref(), Some("done"));
        assert_eq!(res.header("X-Late"), None);
    }

    #[test]
    fn test_drop_without_end_sends_nothing() {
        let (tx, mut rx) = oneshot::channel();
        {
            let mut res = Response::with_responder(tx);
            res.send("never sent");
        }
        assert!(matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
    }

    #[test]
    fn test_forced_status() {
        let (tx, mut rx) = oneshot::channel();
        let mut res = Response::with_responder(tx);
        res.force_status(StatusCode::NOT_FOUND);
        res.set_status(200).send("custom");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        res.end();
        assert_eq!(rx.try_recv().unwrap().status(), 404);
    }

    #[test]
    fn test_fail_replaces_accumulated_state() {
        let (tx, mut rx) = oneshot::channel();
        let mut res = Response::with_responder(tx);
        res.force_status(StatusCode::NOT_FOUND);
        res.set_header("X-Partial", "1").send("partial");
        res.fail();

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.status(), 500);
        assert!(sent.headers().get("x-partial").is_none());
        assert_eq!(sent.body(), &Bytes::from_static(b"Internal Server Error"));
    }

    #[test]
    fn test_redirect_terminates() {
        let (tx, mut rx) = oneshot::channel();
        let mut res = Response::with_responder(tx);
        res.redirect("/login").set_status(200).send("ignored");

        assert!(res.is_ended());
        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.status(), 308);
        assert_eq!(sent.headers()["location"], "/login");
        assert!(sent.body().is_empty());
    }

    #[test]
    fn test_send_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>hi</p>").unwrap();

        let mut res = Response::new();
        res.send_file(&path).unwrap();
        assert_eq!(res.content_type(), Some("text/html"));
        assert_eq!(res.body_string().as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_send_file_unknown_extension_leaves_response_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.unknownext");
        std::fs::write(&path, "data").unwrap();

        let mut res = Response::new();
        res.send("before");
        let err = res.send_file(&path).unwrap_err();

        assert!(matches!(err, Error::ContentTypeNotFound(_)));
        assert!(res.headers().is_empty());
        assert_eq!(res.body_string().as_deref(), Some("before"));
    }

    #[test]
    fn test_send_file_missing() {
        let mut res = Response::new();
        let err = res.send_file("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(res.headers().is_empty());
    }

    #[test]
    fn test_append_header_keeps_every_value() {
        let (tx, mut rx) = oneshot::channel();
        let mut res = Response::with_responder(tx);
        res.append_header("Set-Cookie", "a=1").append_header("Set-Cookie", "b=2");
        assert_eq!(res.headers().len(), 2);
        assert_eq!(res.header("set-cookie"), Some("a=1"));
        res.end();

        let sent = rx.try_recv().unwrap();
        let values: Vec<_> = sent.headers().get_all("set-cookie").iter().collect();
        assert_eq!(values, ["a=1", "b=2"]);

        res.append_header("Set-Cookie", "c=3");
        assert_eq!(res.headers().len(), 2);
    }

    #[test]
    fn test_fail_with_status() {
        let (tx, mut rx) = oneshot::channel();
        let mut res = Response::with_responder(tx);
        res.set_header("X-Partial", "1").send("partial");
        res.fail_with(StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout");

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.status(), 504);
        assert_eq!(sent.headers()["content-type"], "text/plain");
        assert!(sent.headers().get("x-partial").is_none());
        assert_eq!(sent.body(), &Bytes::from_static(b"Gateway Timeout"));
    }

    #[test]
    fn test_render_unknown_extension_leaves_response_untouched() {
        let mut file = tempfile::Builder::new().suffix(".unknownext").tempfile().unwrap();
        write!(file, "{{{{ FOO }}}}").unwrap();

        let mut res = Response::new();
        res.set_status(202).send("before");
        let err = res.render(file.path(), [("foo", "bar")]).unwrap_err();

        assert!(matches!(err, Error::ContentTypeNotFound(_)));
        assert!(res.headers().is_empty());
        assert_eq!(res.status(), StatusCode(202));
        assert_eq!(res.body_string().as_deref(), Some("before"));
    }

    #[test]
    fn test_render() {
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        write!(file, "<h1>{{{{ FOO }}}}</h1><p>{{{{ OTHER }}}}</p>").unwrap();

        let mut res = Response::new();
        res.render(file.path(), [("foo", "bar")]).unwrap();
        assert_eq!(res.content_type(), Some("text/html"));
        assert_eq!(
            res.body_string().as_deref(),
            Some("<h1>bar</h1><p>{{ OTHER }}</p>")
        );
    }
}
