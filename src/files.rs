//! Static-file access.
//!
//! The dispatcher never touches the disk itself. It asks a [`FileSystem`]
//! whether a path exists, whether it is a directory, and for its bytes.
//! [`LocalFs`] answers from `std::fs`; tests and embedders can plug in
//! anything else through [`Router::file_system`](crate::Router::file_system).

use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// Read-only view of the files the router may serve.
pub trait FileSystem: Send + Sync + 'static {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Reads the whole file. A missing file is [`Error::FileNotFound`].
    fn read(&self, path: &Path) -> Result<Vec<u8>, Error>;

    /// The path with every link resolved. File systems without links can
    /// keep the default, which returns the path unchanged.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, Error> {
        Ok(path.to_path_buf())
    }
}

/// The local disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, Error> {
        std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_owned()),
            _ => Error::Io(e),
        })
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, Error> {
        Ok(std::fs::canonicalize(path)?)
    }
}

/// Joins a URL path onto `root`.
///
/// Leading slashes are dropped so the result always stays under `root`.
/// Returns `None` for paths that try to climb out with `..`. Links are not
/// looked at here; see [`confined`].
pub(crate) fn resolve_under(root: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// True when `path`, links resolved, still lies under `root`.
pub(crate) fn confined(fs: &dyn FileSystem, root: &Path, path: &Path) -> bool {
    match (fs.canonicalize(root), fs.canonicalize(path)) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        _ => false,
    }
}
