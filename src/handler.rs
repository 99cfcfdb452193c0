//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The route table holds handlers of *different* types in one `Vec`. Rust
//! collections can only hold one concrete type, so each handler is hidden
//! behind a trait object (`dyn ErasedHandler`) and stored uniformly.
//!
//! ```text
//! fn show(res: &mut Response, req: &Request) { … }   ← user writes this
//!        ↓ router.get("/", show)
//! show.into_boxed_handler()                          ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(show))                          ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(&mut res, &req)  at request time      ← one vtable dispatch
//! ```
//!
//! Handlers are plain synchronous functions. They never own the response;
//! the dispatcher lends them the buffer for the length of the call.

use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

// ── Internal types ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, res: &mut Response, req: &Request) -> Result<(), Error>;
}

/// A type-erased handler shared by every request that hits its route.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Return values ─────────────────────────────────────────────────────────────

/// What a handler may return: nothing, or a `Result` whose error the
/// dispatcher turns into a 500.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<(), Error>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), Error> { Ok(()) }
}

impl IntoOutcome for Result<(), Error> {
    fn into_outcome(self) -> Result<(), Error> { self }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// fn name(res: &mut Response, req: &Request) -> ()
/// fn name(res: &mut Response, req: &Request) -> Result<(), Error>
/// ```
///
/// Closures need their argument types spelled out
/// (`|res: &mut Response, req: &Request| …`) so the compiler can see they
/// accept any borrow.
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, R> private::Sealed for F
where
    F: Fn(&mut Response, &Request) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
}

impl<F, R> Handler for F
where
    F: Fn(&mut Response, &Request) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype that bridges a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut Response, &Request) -> R,
    R: IntoOutcome,
{
    fn call(&self, res: &mut Response, req: &Request) -> Result<(), Error> {
        (self.0)(res, req).into_outcome()
    }
}
