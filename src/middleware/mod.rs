//! Middleware layer.
//!
//! A middleware is a named stage with a `before` predicate and an optional
//! `after` effect. Stages wrap the route handler like nested calls:
//!
//! ```text
//! before(M1) → before(M2) → handler → after(M2) → after(M1)
//! ```
//!
//! A `before` that returns `false` stops the request right there. The
//! handler does not run, later stages never see the request, and the
//! vetoing stage's own `after` is skipped. Every stage that had already
//! said yes still gets its `after`, innermost first, the same as if the
//! handler had returned normally, or had failed, or had panicked. Whatever
//! the stages wrote into the [`Response`] is what the client receives.
//!
//! `before` gets the request mutably so it can leave values in
//! [`Request::extensions_mut`] for the handler to read.
//!
//! Implement [`Middleware`] on a type, or build a [`Stage`] from closures:
//!
//! ```
//! use waypost::{Chain, Request, Response, Stage, StatusCode};
//!
//! let auth = Stage::new("auth", |res: &mut Response, req: &mut Request| {
//!     if req.header_value("authorization").is_some() {
//!         return true;
//!     }
//!     res.status(StatusCode::UNAUTHORIZED).text("login first");
//!     false
//! });
//!
//! let timing = Stage::new("server-header", |_: &mut Response, _: &mut Request| true)
//!     .with_after(|res: &mut Response, _: &Request| {
//!         res.header("server", "waypost");
//!     });
//!
//! let chain = Chain::new().with(timing).with(auth);
//! assert_eq!(chain.len(), 2);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// One stage of a [`Chain`].
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs when this stage vetoes a request.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs before the handler. Return `false` to stop the request.
    fn before(&self, res: &mut Response, req: &mut Request) -> bool;

    /// Runs after the handler, or after an inner stage vetoed, failed or
    /// panicked.
    fn after(&self, _res: &mut Response, _req: &Request) {}
}

type BeforeFn = dyn Fn(&mut Response, &mut Request) -> bool + Send + Sync + 'static;
type AfterFn = dyn Fn(&mut Response, &Request) + Send + Sync + 'static;

/// A [`Middleware`] built from closures.
pub struct Stage {
    name: Cow<'static, str>,
    before: Box<BeforeFn>,
    after: Option<Box<AfterFn>>,
}

impl Stage {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, before: F) -> Self
    where
        F: Fn(&mut Response, &mut Request) -> bool + Send + Sync + 'static,
    {
        Self { name: name.into(), before: Box::new(before), after: None }
    }

    pub fn with_after<F>(mut self, after: F) -> Self
    where
        F: Fn(&mut Response, &Request) + Send + Sync + 'static,
    {
        self.after = Some(Box::new(after));
        self
    }
}

impl Middleware for Stage {
    fn name(&self) -> &str {
        &self.name
    }

    fn before(&self, res: &mut Response, req: &mut Request) -> bool {
        (self.before)(res, req)
    }

    fn after(&self, res: &mut Response, req: &Request) {
        if let Some(after) = &self.after {
            after(res, req);
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// How a chain run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Every `before` passed and the terminal ran.
    Completed,
    /// A `before` returned `false`; the terminal did not run.
    Vetoed,
}

/// An ordered list of middleware, outermost first.
///
/// Cloning is cheap: stages are shared behind `Arc`s, so every route in a
/// group points at the same stage objects.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage as the new innermost one.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.stages.push(middleware);
        self
    }

    /// `self` followed by `inner`. Used when a group nests inside another.
    pub fn concat(&self, inner: &Chain) -> Chain {
        let mut stages = self.stages.clone();
        stages.extend(inner.stages.iter().cloned());
        Chain { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|m| m.name())
    }

    /// Runs the chain around `terminal`.
    ///
    /// The `after` hooks of every stage whose `before` passed run in reverse
    /// order no matter how the inner part ended: an error from `terminal`
    /// is passed on afterwards, and a panic from `terminal` or an inner
    /// `before` resumes once the hooks have run.
    pub fn run<T>(&self, res: &mut Response, req: &mut Request, terminal: T) -> Result<Flow, Error>
    where
        T: FnOnce(&mut Response, &Request) -> Result<(), Error>,
    {
        let mut entered = 0;
        let inner = catch_unwind(AssertUnwindSafe(|| {
            for stage in &self.stages {
                if !stage.before(res, req) {
                    debug!(middleware = stage.name(), path = req.path(), "middleware vetoed request");
                    return Ok(Flow::Vetoed);
                }
                entered += 1;
            }
            terminal(res, &*req).map(|()| Flow::Completed)
        }));

        for stage in self.stages[..entered].iter().rev() {
            stage.after(res, req);
        }

        match inner {
            Ok(outcome) => outcome,
            Err(payload) => resume_unwind(payload),
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::Method;

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording(log: &Log, name: &'static str, pass: bool) -> Stage {
        let before_log = Arc::clone(log);
        let after_log = Arc::clone(log);
        Stage::new(name, move |_: &mut Response, _: &mut Request| {
            before_log.lock().unwrap().push(format!("before {name}"));
            pass
        })
        .with_after(move |_: &mut Response, _: &Request| {
            after_log.lock().unwrap().push(format!("after {name}"));
        })
    }

    fn run(chain: &Chain, log: &Log, result: Result<(), Error>) -> Result<Flow, Error> {
        let mut res = Response::new();
        let mut req = Request::new(Method::GET, "/");
        chain.run(&mut res, &mut req, |_, _| {
            log.lock().unwrap().push("handler".to_owned());
            result
        })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn nesting_order() {
        let log = Log::default();
        let chain = Chain::new().with(recording(&log, "m1", true)).with(recording(&log, "m2", true));

        assert_eq!(run(&chain, &log, Ok(())).unwrap(), Flow::Completed);
        assert_eq!(entries(&log), ["before m1", "before m2", "handler", "after m2", "after m1"]);
    }

    #[test]
    fn outer_veto_skips_everything_else() {
        let log = Log::default();
        let chain = Chain::new().with(recording(&log, "m1", false)).with(recording(&log, "m2", true));

        assert_eq!(run(&chain, &log, Ok(())).unwrap(), Flow::Vetoed);
        assert_eq!(entries(&log), ["before m1"]);
    }

    #[test]
    fn inner_veto_still_unwinds_outer() {
        let log = Log::default();
        let chain = Chain::new().with(recording(&log, "m1", true)).with(recording(&log, "m2", false));

        assert_eq!(run(&chain, &log, Ok(())).unwrap(), Flow::Vetoed);
        assert_eq!(entries(&log), ["before m1", "before m2", "after m1"]);
    }

    #[test]
    fn after_hooks_run_when_handler_fails() {
        let log = Log::default();
        let chain = Chain::new().with(recording(&log, "m1", true));

        let err = run(&chain, &log, Err(Error::msg("boom"))).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(entries(&log), ["before m1", "handler", "after m1"]);
    }

    #[test]
    fn after_hooks_run_when_handler_panics() {
        let log = Log::default();
        let chain = Chain::new().with(recording(&log, "m1", true)).with(recording(&log, "m2", true));
        let mut res = Response::new();
        let mut req = Request::new(Method::GET, "/");

        let caught = std::panic::catch_unwind(AssertUnwindSafe(|| {
            chain.run(&mut res, &mut req, |_, _| panic!("boom"))
        }));
        assert!(caught.is_err());
        assert_eq!(entries(&log), ["before m1", "before m2", "after m2", "after m1"]);
    }

    #[test]
    fn panicking_before_unwinds_outer_stages_only() {
        let log = Log::default();
        let chain = Chain::new()
            .with(recording(&log, "m1", true))
            .with(Stage::new("broken", |_: &mut Response, _: &mut Request| -> bool {
                panic!("bad stage")
            }))
            .with(recording(&log, "m3", true));
        let mut res = Response::new();
        let mut req = Request::new(Method::GET, "/");

        let caught = std::panic::catch_unwind(AssertUnwindSafe(|| {
            chain.run(&mut res, &mut req, |_, _| Ok(()))
        }));
        assert!(caught.is_err());
        assert_eq!(entries(&log), ["before m1", "after m1"]);
    }

    #[test]
    fn before_can_hand_values_to_the_terminal() {
        #[derive(Clone)]
        struct Tenant(&'static str);

        let chain = Chain::new().with(Stage::new("tenant", |_: &mut Response, req: &mut Request| {
            req.extensions_mut().insert(Tenant("acme"));
            true
        }));
        let mut res = Response::new();
        let mut req = Request::new(Method::GET, "/");

        chain
            .run(&mut res, &mut req, |res, req| {
                let tenant = req.extensions().get::<Tenant>().map_or("none", |t| t.0);
                res.text(tenant);
                Ok(())
            })
            .unwrap();
        assert_eq!(res.body_bytes(), b"acme");
    }

    #[test]
    fn empty_chain_runs_terminal() {
        let log = Log::default();
        assert_eq!(run(&Chain::new(), &log, Ok(())).unwrap(), Flow::Completed);
        assert_eq!(entries(&log), ["handler"]);
    }

    #[test]
    fn stages_can_write_the_response() {
        let chain = Chain::new().with(Stage::new("deny", |res: &mut Response, _: &mut Request| {
            res.status(http::StatusCode::FORBIDDEN).text("no");
            false
        }));
        let mut res = Response::new();
        let mut req = Request::new(Method::GET, "/");

        let flow = chain.run(&mut res, &mut req, |_, _| Ok(())).unwrap();
        assert_eq!(flow, Flow::Vetoed);
        assert_eq!(res.status_code(), http::StatusCode::FORBIDDEN);
        assert_eq!(res.body_bytes(), b"no");
    }

    #[test]
    fn concat_keeps_outer_first() {
        struct Named(&'static str);
        impl Middleware for Named {
            fn name(&self) -> &str { self.0 }
            fn before(&self, _: &mut Response, _: &mut Request) -> bool { true }
        }

        let outer = Chain::new().with(Named("outer"));
        let inner = Chain::new().with(Named("inner"));
        let joined = outer.concat(&inner);
        assert_eq!(joined.names().collect::<Vec<_>>(), ["outer", "inner"]);
        assert_eq!(outer.len(), 1);
    }
}
