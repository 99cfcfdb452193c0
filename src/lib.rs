//! # waypost
//!
//! A minimal HTTP router. Match a route or serve a file. That is the job.
//!
//! ## What a request goes through
//!
//! 1. **Routes**: registered patterns are scanned in order. `:name` segments
//!    bind path parameters, everything else must match literally. The first
//!    match wins; a path that only matches under other methods is a `405`.
//! 2. **Middleware**: the matched route's chain of named stages runs around
//!    the handler. Any stage can stop the request.
//! 3. **Files**: `GET`/`HEAD` requests no route claimed are looked up under
//!    the document root, then answered with the entry file, for single-page
//!    apps. The order of these three steps is configurable.
//! 4. **Flush**: the buffered response is sent once, gzip-compressed when
//!    the client accepts it.
//!
//! What waypost leaves out on purpose: wildcard segments, radix trees,
//! content negotiation beyond "does the client take gzip".
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use waypost::{Chain, Error, Request, Response, Router, Server, Stage, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let auth = Stage::new("auth", |res: &mut Response, req: &mut Request| {
//!         if req.header_value("authorization").is_some() {
//!             return true;
//!         }
//!         res.status(StatusCode::UNAUTHORIZED);
//!         false
//!     });
//!
//!     let app = Router::new()
//!         .get("/users/:name", show_user)
//!         .group("/admin", Chain::new().with(auth), |r| {
//!             r.post("/users", create_user)
//!         })
//!         .doc_root("./public");
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! fn show_user(res: &mut Response, req: &Request) {
//!     res.text(format!("hello {}", req.param("name").unwrap_or("stranger")));
//! }
//!
//! fn create_user(res: &mut Response, _req: &Request) -> Result<(), Error> {
//!     res.status(StatusCode::CREATED)
//!         .json(&serde_json::json!({ "id": 99 }))?;
//!     Ok(())
//! }
//! ```

mod config;
mod dispatch;
mod error;
mod files;
mod handler;
mod params;
mod path;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod mime;

pub use config::{Config, Try};
pub use error::Error;
pub use files::{FileSystem, LocalFs};
pub use handler::{Handler, IntoOutcome};
pub use middleware::{Chain, Flow, Middleware, Stage};
pub use params::Params;
pub use path::PathPattern;
pub use request::Request;
pub use response::Response;
pub use router::Router;
pub use server::Server;

pub use http::{Method, StatusCode};
