//! Route registration.
//!
//! Routes live in one ordered table and are matched by a linear scan, first
//! registration first. There is no per-method tree: a path that matches under
//! the wrong method still has to be seen so the dispatcher can answer `405`.
//!
//! Groups add a path prefix and middleware to everything registered inside
//! their callback. They nest by concatenation and are scoped lexically: once
//! the callback returns, the prefix and middleware in effect before the group
//! are back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::error;

use crate::config::{Config, Try, dedup_tries};
use crate::error::Error;
use crate::files::{FileSystem, LocalFs};
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::Chain;
use crate::path::PathPattern;
use crate::request::Request;
use crate::response::Response;

pub(crate) type Gate = Arc<dyn Fn(&mut Response, &Request) -> bool + Send + Sync>;
pub(crate) type FileGate = Arc<dyn Fn(&mut Response, &Request, &Path) -> bool + Send + Sync>;
pub(crate) type ErrorHook = Arc<dyn Fn(&mut Response, &Request, &Error) + Send + Sync>;

/// One registered route.
pub(crate) struct Route {
    pub(crate) method: Method,
    pub(crate) pattern: PathPattern,
    pub(crate) chain: Chain,
    pub(crate) handler: BoxedHandler,
}

/// Callbacks the dispatcher consults outside of route handlers.
pub(crate) struct Hooks {
    pub(crate) not_found: BoxedHandler,
    pub(crate) method_not_allowed: BoxedHandler,
    pub(crate) before_api: Gate,
    pub(crate) before_path_file: FileGate,
    pub(crate) before_entry_file: FileGate,
    pub(crate) on_internal_error: ErrorHook,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            not_found: not_found.into_boxed_handler(),
            method_not_allowed: method_not_allowed.into_boxed_handler(),
            before_api: Arc::new(|_: &mut Response, _: &Request| true),
            before_path_file: Arc::new(|_: &mut Response, _: &Request, _: &Path| true),
            before_entry_file: Arc::new(|_: &mut Response, _: &Request, _: &Path| true),
            on_internal_error: Arc::new(internal_error),
        }
    }
}

fn not_found(res: &mut Response, _req: &Request) {
    res.status(StatusCode::NOT_FOUND).text("not found");
}

fn method_not_allowed(res: &mut Response, _req: &Request) {
    res.status(StatusCode::METHOD_NOT_ALLOWED).text("method not allowed");
}

fn internal_error(res: &mut Response, req: &Request, err: &Error) {
    error!(method = %req.method(), path = req.path(), "request failed: {err}");
    res.clear().status(StatusCode::INTERNAL_SERVER_ERROR).text("internal server error");
}

/// The application router.
///
/// Build it once at startup; every builder method takes and returns `self`
/// so registrations chain naturally. Pass the finished router to
/// [`Server::serve`](crate::Server::serve), or call
/// [`Router::serve`] yourself from any transport.
///
/// ```
/// use waypost::{Chain, Request, Response, Router, Stage};
///
/// fn hello(res: &mut Response, req: &Request) {
///     res.text(format!("hello {}", req.param("name").unwrap_or("stranger")));
/// }
///
/// let logged_in = Stage::new("logged-in", |_: &mut Response, req: &mut Request| {
///     req.header_value("cookie").is_some()
/// });
///
/// let app = Router::new()
///     .get("/hello/:name", hello)
///     .group("/admin", Chain::new().with(logged_in), |r| {
///         r.get("/hello/:name", hello)
///     })
///     .doc_root("./public");
/// ```
pub struct Router {
    pub(crate) routes: Vec<Route>,
    pub(crate) config: Config,
    pub(crate) hooks: Hooks,
    pub(crate) fs: Box<dyn FileSystem>,
    prefix: String,
    chain: Chain,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            config: Config::default(),
            hooks: Hooks::default(),
            fs: Box::new(LocalFs),
            prefix: String::new(),
            chain: Chain::new(),
        }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Registers a handler for a method + path pair.
    ///
    /// Path parameters use `:name` segments, read back with `req.param("name")`.
    /// Inside a [`group`](Router::group) the group's prefix is prepended and its
    /// middleware wraps the handler.
    pub fn handle(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes.push(Route {
            method,
            pattern: PathPattern::new(format!("{}{path}", self.prefix)),
            chain: self.chain.clone(),
            handler: handler.into_boxed_handler(),
        });
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::DELETE, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::PATCH, path, handler)
    }

    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::HEAD, path, handler)
    }

    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::OPTIONS, path, handler)
    }

    pub fn connect(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::CONNECT, path, handler)
    }

    pub fn trace(self, path: &str, handler: impl Handler) -> Self {
        self.handle(Method::TRACE, path, handler)
    }

    /// Registers the routes added by `routes` under `prefix`, wrapped in
    /// `middleware`.
    ///
    /// Nested groups see the outer prefix and middleware already applied:
    /// `group("/api", [m1], |r| r.group("/v1", [m2], |r| r.get("/x", h)))`
    /// registers `/api/v1/x` behind `m1` then `m2`.
    pub fn group<F>(mut self, prefix: &str, middleware: Chain, routes: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        let outer_prefix = self.prefix.clone();
        let outer_chain = self.chain.clone();

        self.prefix.push_str(prefix);
        self.chain = outer_chain.concat(&middleware);

        let mut router = routes(self);
        router.prefix = outer_prefix;
        router.chain = outer_chain;
        router
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// Replaces the whole configuration.
    pub fn config(mut self, mut config: Config) -> Self {
        config.tries = dedup_tries(config.tries);
        self.config = config;
        self
    }

    pub fn doc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.doc_root = root.into();
        self
    }

    pub fn entry_file(mut self, file: impl Into<String>) -> Self {
        self.config.entry_file = file.into();
        self
    }

    /// Sets the strategy order for `GET`/`HEAD`. Repeats are dropped.
    pub fn tries(mut self, tries: impl IntoIterator<Item = Try>) -> Self {
        self.config.tries = dedup_tries(tries);
        self
    }

    /// Serves static files from `fs` instead of the local disk.
    pub fn file_system(mut self, fs: impl FileSystem) -> Self {
        self.fs = Box::new(fs);
        self
    }

    // ── Hooks ─────────────────────────────────────────────────────────────────

    /// Handler run when every strategy came up empty. Defaults to a plain
    /// `404 not found`.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.hooks.not_found = handler.into_boxed_handler();
        self
    }

    /// Handler run when a path matched only under other methods. The `Allow`
    /// header is already set when it runs.
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.hooks.method_not_allowed = handler.into_boxed_handler();
        self
    }

    /// Gate consulted after a route matched, before its middleware. Returning
    /// `false` ends the request with whatever the gate wrote.
    pub fn before_api<F>(mut self, gate: F) -> Self
    where
        F: Fn(&mut Response, &Request) -> bool + Send + Sync + 'static,
    {
        self.hooks.before_api = Arc::new(gate);
        self
    }

    /// Gate consulted before a path-addressed file is served. It receives the
    /// resolved file path; returning `false` keeps the file's bytes out of
    /// the response.
    pub fn before_path_file<F>(mut self, gate: F) -> Self
    where
        F: Fn(&mut Response, &Request, &Path) -> bool + Send + Sync + 'static,
    {
        self.hooks.before_path_file = Arc::new(gate);
        self
    }

    /// Same as [`before_path_file`](Router::before_path_file), for the entry file.
    pub fn before_entry_file<F>(mut self, gate: F) -> Self
    where
        F: Fn(&mut Response, &Request, &Path) -> bool + Send + Sync + 'static,
    {
        self.hooks.before_entry_file = Arc::new(gate);
        self
    }

    /// Called when a handler returns an error or anything in the dispatch
    /// panics. The default clears the response and answers `500`.
    pub fn on_internal_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Response, &Request, &Error) + Send + Sync + 'static,
    {
        self.hooks.on_internal_error = Arc::new(hook);
        self
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
