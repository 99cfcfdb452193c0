//! Incoming HTTP request type.

use std::collections::HashMap;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use bytes::Bytes;
use http::{Extensions, Method};
use http_body_util::BodyExt;
use url::form_urlencoded;

use crate::error::Error;
use crate::params::Params;

/// An incoming HTTP request.
///
/// The server builds one per request from hyper's types. Tests and other
/// transports can build one directly:
///
/// ```
/// use waypost::{Method, Request};
///
/// let req = Request::new(Method::POST, "/users")
///     .header("content-type", "application/json")
///     .body(r#"{"name":"ann"}"#);
/// assert_eq!(req.header_value("Content-Type"), Some("application/json"));
/// ```
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
    params: Params,
    remote_addr: Option<SocketAddr>,
    extensions: Extensions,
}

impl Request {
    /// A request for `target`. Anything after a `?` becomes the query.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (target.to_owned(), None),
        };
        Self {
            method,
            path,
            query,
            headers: Vec::new(),
            body: Bytes::new(),
            params: Params::new(),
            remote_addr: None,
            extensions: Extensions::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Reads a hyper request to the end. Header values that are not valid
    /// UTF-8 are skipped.
    pub(crate) async fn from_hyper<B>(
        req: hyper::Request<B>,
        remote_addr: SocketAddr,
    ) -> Result<Self, Error>
    where
        B: hyper::body::Body<Data = Bytes>,
        Error: From<B::Error>,
    {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        let headers = parts
            .headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers,
            body,
            params: Params::new(),
            remote_addr: Some(remote_addr),
            extensions: parts.extensions,
        })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body_bytes(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn header_values<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Values attached to this request by middleware, keyed by type.
    ///
    /// ```
    /// use waypost::{Method, Request};
    ///
    /// #[derive(Clone)]
    /// struct UserId(u64);
    ///
    /// let mut req = Request::new(Method::GET, "/");
    /// req.extensions_mut().insert(UserId(7));
    /// assert_eq!(req.extensions().get::<UserId>().map(|u| u.0), Some(7));
    /// ```
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    // ── Form fields ───────────────────────────────────────────────────────────

    /// Every decoded form pair in order: an urlencoded body first (for
    /// `POST`, `PUT` and `PATCH`), then the query string.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        let body: &[u8] = if self.has_form_body() { &self.body } else { &[] };
        let query = self.query.as_deref().unwrap_or_default().as_bytes();
        form_urlencoded::parse(body)
            .chain(form_urlencoded::parse(query))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// First value for `name`, body before query.
    pub fn form_value(&self, name: &str) -> Option<String> {
        self.form_pairs().into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn form_int(&self, name: &str) -> Result<i64, Error> {
        self.form_parse(name)
    }

    pub fn form_uint(&self, name: &str) -> Result<u64, Error> {
        self.form_parse(name)
    }

    pub fn form_float(&self, name: &str) -> Result<f64, Error> {
        self.form_parse(name)
    }

    /// Absent, empty, `0` and `false` are false; anything else is true.
    pub fn form_bool(&self, name: &str) -> bool {
        !matches!(self.form_value(name).as_deref(), None | Some("" | "0" | "false"))
    }

    /// Items of a list field, from a comma-separated `name=a,b` and from
    /// indexed keys `name[]=c` / `name[0]=d`. Empty items are dropped.
    pub fn form_slice(&self, name: &str) -> Vec<String> {
        let pairs = self.form_pairs();
        let mut items: Vec<String> = pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.split(',').map(str::to_owned).collect())
            .unwrap_or_default();
        items.extend(
            pairs
                .iter()
                .filter(|(k, _)| {
                    subscript(k, name).is_some_and(|i| i.bytes().all(|b| b.is_ascii_digit()))
                })
                .map(|(_, v)| v.clone()),
        );
        items.retain(|v| !v.is_empty());
        items
    }

    /// Entries of a map field sent as `name[key]=value`. The first value
    /// wins for a repeated key.
    pub fn form_map(&self, name: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for (k, v) in self.form_pairs() {
            let Some(key) = subscript(&k, name) else { continue };
            if !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_') {
                map.entry(key.to_owned()).or_insert(v);
            }
        }
        map
    }

    fn form_parse<T>(&self, name: &str) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .form_value(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::MissingField(name.to_owned()))?;
        raw.parse::<T>().map_err(|e| Error::InvalidField {
            field: name.to_owned(),
            reason: e.to_string(),
        })
    }

    fn has_form_body(&self) -> bool {
        let writes_body =
            self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH;
        writes_body
            && self
                .header_value("content-type")
                .and_then(|v| v.split(';').next())
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
    }

    /// True if any `Accept-Encoding` header lists `gzip`. A `q=0` weight
    /// counts as a refusal; every other weight counts as acceptance.
    pub fn accepts_gzip(&self) -> bool {
        self.header_values("accept-encoding")
            .flat_map(|v| v.split(','))
            .any(|token| {
                let (coding, weights) = token.split_once(';').unwrap_or((token, ""));
                coding.trim().eq_ignore_ascii_case("gzip") && !weights.split(';').any(is_zero_weight)
            })
    }

    pub(crate) fn is_retrieval(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

/// `inner` for a key shaped `field[inner]`.
fn subscript<'k>(key: &'k str, field: &str) -> Option<&'k str> {
    key.strip_prefix(field)?.strip_prefix('[')?.strip_suffix(']')
}

fn is_zero_weight(param: &str) -> bool {
    let param = param.trim();
    param
        .strip_prefix("q=")
        .or_else(|| param.strip_prefix("Q="))
        .and_then(|q| q.trim().parse::<f32>().ok())
        .is_some_and(|q| q == 0.0)
}
