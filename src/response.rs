//! The response buffer and its single flush.
//!
//! Handlers and middleware never talk to the connection. They mutate a
//! [`Response`] the dispatcher owns for the length of one request; once the
//! request is resolved the dispatcher calls [`Response::flush`], which is
//! the only place bytes leave the router.

use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::StatusCode;
use http::header::CONTENT_ENCODING;
use http_body_util::Full;
use serde::Serialize;

use crate::error::Error;
use crate::files::{FileSystem, LocalFs};
use crate::mime::guess_content_type;
use crate::request::Request;

const TEXT: &str = "text/plain; charset=utf-8";
const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

/// An outgoing HTTP response, buffered in memory until flushed.
///
/// Setters return `&mut Self` so calls chain:
///
/// ```
/// use waypost::{Response, StatusCode};
///
/// let mut res = Response::new();
/// res.status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .text("created");
///
/// assert_eq!(res.status_code(), StatusCode::CREATED);
/// assert_eq!(res.header_value("Content-Type"), Some("text/plain; charset=utf-8"));
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

impl Response {
    /// An empty `200 OK`.
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: Vec::new(), body: Vec::new() }
    }

    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        self.status = code;
        self
    }

    /// Sets a header. Names compare case-insensitively; writing the same
    /// name twice keeps the position of the first write and the value of the
    /// last.
    pub fn header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value,
            None => self.headers.push((name.to_owned(), value)),
        }
        self
    }

    /// Replaces the body with raw bytes. The content type is left alone.
    pub fn body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// `text/plain; charset=utf-8` body.
    pub fn text(&mut self, body: impl Into<String>) -> &mut Self {
        self.header("content-type", TEXT).body(body.into())
    }

    /// `text/html; charset=utf-8` body.
    pub fn html(&mut self, body: impl Into<String>) -> &mut Self {
        self.header("content-type", HTML).body(body.into())
    }

    /// Serialises `value` as the `application/json` body.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.header("content-type", JSON).body(bytes))
    }

    /// Reads a file from the local disk into the body.
    pub fn file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, Error> {
        self.file_from(&LocalFs, path.as_ref())
    }

    /// Reads a file through `fs` into the body and sets its content type.
    pub fn file_from(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<&mut Self, Error> {
        let bytes = fs.read(path)?;
        Ok(self.header("content-type", guess_content_type(path)).body(bytes))
    }

    /// Drops everything written so far and starts over as an empty `200 OK`.
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::new();
        self
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body_bytes(&self) -> &[u8] { &self.body }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Turns the buffer into the response the transport sends.
    ///
    /// Headers go first, then the status, then the body. The body is gzip
    /// compressed when `req` accepts gzip and no handler already chose a
    /// `Content-Encoding`. `HEAD` requests get headers only.
    ///
    /// Consuming `self` means a buffer can only ever be flushed once.
    pub fn flush(self, req: &Request) -> Result<http::Response<Full<Bytes>>, Error> {
        let mut builder = http::Response::builder();
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let compress = req.accepts_gzip() && self.header_value(CONTENT_ENCODING.as_str()).is_none();
        let body = if compress {
            builder = builder.header(CONTENT_ENCODING, "gzip");
            gzip(&self.body)?
        } else {
            self.body
        };

        builder = builder.status(self.status);

        let body = if req.method() == http::Method::HEAD { Bytes::new() } else { Bytes::from(body) };
        Ok(builder.body(Full::new(body))?)
    }
}

fn gzip(body: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}
