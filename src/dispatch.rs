//! Per-request resolution.
//!
//! `GET` and `HEAD` walk the configured [`Try`] order:
//!
//! ```text
//! Api ──no match──▶ PathFile ──no file──▶ EntryFile ──no file──▶ 404
//! ```
//!
//! Every other method only tries the registered routes, then 404s. The first
//! strategy that produces an answer ends the walk. A `405` also ends it; that
//! answer only comes after the whole route table was scanned without finding
//! the method, so a later registration for the same path still wins.
//!
//! Handler errors and panics are caught once, here, and handed to the
//! router's internal-error hook. Nothing else in the crate recovers from
//! failures.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use tracing::{debug, error, info, warn};

use crate::config::Try;
use crate::error::Error;
use crate::files::{confined, resolve_under};
use crate::middleware::Flow;
use crate::mime::guess_content_type;
use crate::request::Request;
use crate::response::Response;
use crate::router::{FileGate, Router};

/// Outcome of one strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
    Handled,
    Vetoed,
    MethodNotAllowed,
    NoMatch,
}

impl Router {
    /// Resolves one request and returns the response to send.
    ///
    /// Never fails: routing misses become 404/405, handler failures become
    /// whatever the internal-error hook writes, and a response that cannot be
    /// encoded becomes a bare 500.
    ///
    /// ```
    /// use waypost::{Method, Request, Response, Router, StatusCode};
    ///
    /// let app = Router::new().get("/users/:id", |res: &mut Response, req: &Request| {
    ///     res.text(format!("user {}", req.param("id").unwrap_or_default()));
    /// });
    ///
    /// let ok = app.serve(Request::new(Method::GET, "/users/7"));
    /// assert_eq!(ok.status(), StatusCode::OK);
    ///
    /// let wrong_method = app.serve(Request::new(Method::POST, "/users/7"));
    /// assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
    /// ```
    pub fn serve(&self, mut req: Request) -> http::Response<Full<Bytes>> {
        let mut res = Response::new();

        let outcome = catch_unwind(AssertUnwindSafe(|| self.resolve(&mut res, &mut req)))
            .unwrap_or_else(|payload| Err(Error::Panic(panic_message(payload.as_ref()))));
        if let Err(err) = outcome {
            (self.hooks.on_internal_error)(&mut res, &req, &err);
        }

        info!(
            method = %req.method(),
            path = req.path(),
            status = res.status_code().as_u16(),
            peer = ?req.remote_addr(),
            "request served"
        );

        res.flush(&req).unwrap_or_else(|err| {
            error!(path = req.path(), "failed to encode response: {err}");
            let mut fallback = http::Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }

    fn resolve(&self, res: &mut Response, req: &mut Request) -> Result<(), Error> {
        if !req.is_retrieval() {
            if self.try_api(res, req)? == Attempt::NoMatch {
                self.hooks.not_found.call(res, req)?;
            }
            return Ok(());
        }

        for strategy in &self.config.tries {
            let attempt = match strategy {
                Try::Api => self.try_api(res, req)?,
                Try::PathFile => {
                    let path = req.path().to_owned();
                    self.try_file(res, req, &path, &self.hooks.before_path_file)?
                }
                Try::EntryFile => {
                    self.try_file(res, req, &self.config.entry_file, &self.hooks.before_entry_file)?
                }
            };
            debug!(?strategy, ?attempt, path = req.path(), "strategy tried");
            if attempt != Attempt::NoMatch {
                return Ok(());
            }
        }

        self.hooks.not_found.call(res, req)
    }

    fn try_api(&self, res: &mut Response, req: &mut Request) -> Result<Attempt, Error> {
        let mut allowed: Vec<&Method> = Vec::new();
        let mut found = None;
        // HEAD falls back to the first GET route when no HEAD route matches.
        let mut head_as_get = None;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(req.path()) else {
                continue;
            };
            if route.method == *req.method() {
                found = Some((route, params));
                break;
            }
            if *req.method() == Method::HEAD && route.method == Method::GET {
                head_as_get.get_or_insert((route, params));
                continue;
            }
            if !allowed.contains(&&route.method) {
                allowed.push(&route.method);
            }
        }

        let Some((route, params)) = found.or(head_as_get) else {
            if allowed.is_empty() {
                return Ok(Attempt::NoMatch);
            }
            let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            res.header("allow", allow);
            self.hooks.method_not_allowed.call(res, &*req)?;
            return Ok(Attempt::MethodNotAllowed);
        };

        req.set_params(params);
        if !(self.hooks.before_api)(res, &*req) {
            debug!(path = req.path(), "api gate vetoed request");
            return Ok(Attempt::Vetoed);
        }
        let flow = route.chain.run(res, req, |res, req| route.handler.call(res, req))?;
        Ok(match flow {
            Flow::Completed => Attempt::Handled,
            Flow::Vetoed => Attempt::Vetoed,
        })
    }

    fn try_file(
        &self,
        res: &mut Response,
        req: &Request,
        file: &str,
        gate: &FileGate,
    ) -> Result<Attempt, Error> {
        let Some(path) = resolve_under(&self.config.doc_root, file) else {
            debug!(file, "refusing path outside the document root");
            return Ok(Attempt::NoMatch);
        };
        if !self.fs.exists(&path) || self.fs.is_dir(&path) {
            return Ok(Attempt::NoMatch);
        }
        if !confined(self.fs.as_ref(), &self.config.doc_root, &path) {
            warn!(path = %path.display(), "refusing file that resolves outside the document root");
            return Ok(Attempt::NoMatch);
        }

        // The gate only ever sees files that were read.
        let bytes = match self.fs.read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => return Ok(Attempt::NoMatch),
            Err(err) => return Err(err),
        };

        res.status(StatusCode::OK);
        if !gate(res, req, &path) {
            debug!(path = %path.display(), "file gate vetoed request");
            return Ok(Attempt::Vetoed);
        }
        res.header("content-type", guess_content_type(&path)).body(bytes);
        Ok(Attempt::Handled)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
