//! Unified error type.

use std::path::PathBuf;

use thiserror::Error;

/// The error type returned by waypost's fallible operations.
///
/// Routing outcomes (404, 405, a middleware saying no) are not errors; they
/// are written into the [`Response`](crate::Response) like any other answer.
/// An `Error` that escapes a handler is caught by the dispatcher and handed
/// to the router's internal-error hook, which answers with a 500 by default.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A static file vanished or was never there.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The buffered response could not be turned into a valid HTTP response,
    /// usually because of an illegal header name or value.
    #[error("http: {0}")]
    Http(#[from] http::Error),

    #[error("hyper: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    /// A form field a handler asked for is absent or empty.
    #[error("form field `{0}` not found")]
    MissingField(String),

    #[error("form field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    /// A handler, middleware or hook panicked during dispatch.
    #[error("handler panicked: {0}")]
    Panic(String),

    #[error("{0}")]
    Message(String),
}

impl From<std::convert::Infallible> for Error {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

impl Error {
    /// Builds an ad-hoc error from a message. Handy for returning early from
    /// a handler with `Err(Error::msg("..."))`.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// True for the failure that static-file strategies treat as "try the
    /// next strategy" rather than as fatal.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_covers_missing_files_and_io_not_found() {
        assert!(Error::FileNotFound(PathBuf::from("a.txt")).is_not_found());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::from(io).is_not_found());
        assert!(!Error::msg("boom").is_not_found());
    }

    #[test]
    fn display_includes_context() {
        assert_eq!(Error::msg("boom").to_string(), "boom");
        assert_eq!(
            Error::InvalidAddress("nope".into()).to_string(),
            "invalid socket address `nope`"
        );
        assert_eq!(Error::MissingField("age".into()).to_string(), "form field `age` not found");
        assert_eq!(
            Error::InvalidField { field: "age".into(), reason: "invalid digit found in string".into() }
                .to_string(),
            "form field `age`: invalid digit found in string"
        );
    }
}
