//! Minimal waypost example: JSON endpoints behind a token check, with a
//! single-page app served from `./public`.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/api/users -H 'x-token: demo'
//!   curl -X DELETE http://localhost:3000/users/42        # 405
//!   curl --compressed http://localhost:3000/some/page    # entry file

use waypost::{Chain, Error, Request, Response, Router, Server, Stage, StatusCode};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let token = Stage::new("token", |res: &mut Response, req: &mut Request| {
        if req.header_value("x-token") == Some("demo") {
            return true;
        }
        res.status(StatusCode::UNAUTHORIZED).text("missing x-token");
        false
    });
    let powered_by = Stage::new("powered-by", |_: &mut Response, _: &mut Request| true)
        .with_after(|res: &mut Response, _: &Request| {
            res.header("x-powered-by", "waypost");
        });

    let app = Router::new()
        .get("/users/:id", get_user)
        .group("/api", Chain::new().with(powered_by).with(token), |r| {
            r.post("/users", create_user)
        })
        .doc_root("./public")
        .entry_file("index.html");

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /users/:id
fn get_user(res: &mut Response, req: &Request) -> Result<(), Error> {
    let id = req.param("id").unwrap_or("unknown");
    res.json(&serde_json::json!({ "id": id, "name": "alice" }))?;
    Ok(())
}

// POST /api/users
fn create_user(res: &mut Response, _req: &Request) -> Result<(), Error> {
    res.status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(&serde_json::json!({ "id": "99", "name": "new_user" }))?;
    Ok(())
}
