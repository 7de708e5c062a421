//! Tagged inputs that are either filesystem paths or already-loaded values.
//!
//! Loaders that accept "a path or an object" take a [`Source`] and resolve
//! it exactly once, before any computation runs. A `Loaded` value passes
//! through untouched; a `Path` is handed to the type's loader after a
//! sanity check that it names a regular file.

use crate::error::{Result, UniFracError};
use std::path::{Path, PathBuf};

/// An input that is either a filesystem path or an already-loaded value.
#[derive(Debug, Clone)]
pub enum Source<T> {
    /// A path to be read and parsed by the type's loader.
    Path(PathBuf),
    /// A value already in memory.
    Loaded(T),
}

impl<T> Source<T> {
    /// Create a path source.
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        Source::Path(path.into())
    }

    /// Create a source from an already-loaded value.
    pub fn loaded(value: T) -> Self {
        Source::Loaded(value)
    }

    /// Resolve to a value, loading from the path if necessary.
    ///
    /// `param` names the argument in error messages. A path that exists
    /// but is not a regular file fails with `UnsupportedType`; a missing
    /// file surfaces as the loader's I/O error.
    pub fn resolve_with<F>(self, param: &'static str, load: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        match self {
            Source::Loaded(value) => Ok(value),
            Source::Path(path) => {
                if path.exists() && !path.is_file() {
                    return Err(UniFracError::UnsupportedType {
                        param,
                        actual: format!("'{}' is not a regular file", path.display()),
                    });
                }
                load(&path)
            }
        }
    }
}

impl<T> From<&str> for Source<T> {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl<T> From<&Path> for Source<T> {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl<T> From<PathBuf> for Source<T> {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}
