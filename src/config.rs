//! Router configuration.
//!
//! Everything here is fixed once the router is built. It can be set in code
//! through the [`Router`](crate::Router) builder, or loaded from TOML:
//!
//! ```toml
//! doc_root   = "./public"
//! entry_file = "index.html"
//! tries      = ["api", "pathfile", "entryfile"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// One way of resolving a request, attempted in the order of [`Config::tries`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Try {
    /// Registered routes.
    Api,
    /// The request path as a file under the document root.
    PathFile,
    /// The configured entry file, for single-page apps.
    EntryFile,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory static files are served from.
    pub doc_root: PathBuf,
    /// File served by [`Try::EntryFile`], relative to `doc_root`.
    pub entry_file: String,
    /// Strategy order for `GET`/`HEAD`. Other methods only try routes.
    pub tries: Vec<Try>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            doc_root: PathBuf::from("."),
            entry_file: "index.html".to_owned(),
            tries: vec![Try::Api, Try::PathFile, Try::EntryFile],
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        let mut config: Self = toml::from_str(source)?;
        config.tries = dedup_tries(config.tries);
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }
}

/// Keeps the first occurrence of every strategy.
pub(crate) fn dedup_tries(tries: impl IntoIterator<Item = Try>) -> Vec<Try> {
    let mut seen = Vec::with_capacity(3);
    for t in tries {
        if !seen.contains(&t) {
            seen.push(t);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn toml_overrides() {
        let config = Config::from_toml(
            r#"
            doc_root = "/srv/app"
            tries = ["pathfile", "api", "pathfile"]
            "#,
        )
        .unwrap();

        assert_eq!(config.doc_root, PathBuf::from("/srv/app"));
        assert_eq!(config.entry_file, "index.html");
        assert_eq!(config.tries, vec![Try::PathFile, Try::Api]);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = Config::from_toml(r#"tries = ["cache"]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.toml");
        std::fs::write(&path, r#"entry_file = "app.html""#).unwrap();

        assert_eq!(Config::load(&path).unwrap().entry_file, "app.html");
        assert!(matches!(Config::load(dir.path().join("missing.toml")), Err(Error::Io(_))));
    }
}
