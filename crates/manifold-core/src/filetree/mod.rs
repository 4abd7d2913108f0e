//! File tree abstraction.
//!
//! Every resolver reads descriptors through `FileTree`. Implementations:
//! - `InMemoryFileTree`: synthetic trees (tests, plugin hosts)
//! - `LocalDirFileTree`: a checkout on disk
//! - `RepositoryFileTree`: one repository/version served by a `RepositoryAccessor`
//! - `CachingFileTree`: memoizing decorator over any of the above
//!
//! Paths are absolute, forward-slashed and normalized (see `crate::path`).
//! A missing file is `Ok(None)`, never an error. Errors are reserved for
//! accessor failures and unsupported operations.

mod caching;
mod in_memory;
mod local;
mod repository;

pub use caching::{CacheStats, CachingFileTree};
pub use in_memory::InMemoryFileTree;
pub use local::LocalDirFileTree;
pub use repository::{RepositoryAccessor, RepositoryFileTree, StaticAccessor};

use std::collections::BTreeSet;

use crate::errors::{ManifoldError, ManifoldResult};
use crate::fileset::FileType;
use crate::path::normalize;

pub trait FileTree {
    /// Content of the file at `path`, or `None` when there is no such file.
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>>;

    /// Names of the immediate children of `dir`, files and directories alike.
    ///
    /// Listing a missing directory or a file yields an empty list.
    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>>;

    /// Every file path known to the tree.
    fn list_paths(&self) -> ManifoldResult<Vec<String>> {
        Err(ManifoldError::invalid_argument(
            "this file tree does not support listing every path",
        ))
    }

    /// Read a file the caller is about to record as `file_type`.
    ///
    /// Repository-backed trees forward the type to the accessor; the rest
    /// ignore it.
    fn read_typed(&self, path: &str, file_type: FileType) -> ManifoldResult<Option<String>> {
        let _ = file_type;
        self.read_file(path)
    }
}

impl<T: FileTree + ?Sized> FileTree for &T {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        (**self).read_file(path)
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        (**self).list_files(dir)
    }

    fn list_paths(&self) -> ManifoldResult<Vec<String>> {
        (**self).list_paths()
    }

    fn read_typed(&self, path: &str, file_type: FileType) -> ManifoldResult<Option<String>> {
        (**self).read_typed(path, file_type)
    }
}

impl<T: FileTree + ?Sized> FileTree for Box<T> {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        (**self).read_file(path)
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        (**self).list_files(dir)
    }

    fn list_paths(&self) -> ManifoldResult<Vec<String>> {
        (**self).list_paths()
    }

    fn read_typed(&self, path: &str, file_type: FileType) -> ManifoldResult<Option<String>> {
        (**self).read_typed(path, file_type)
    }
}

/// Immediate child names of `dir` given the full set of file paths.
///
/// Output is sorted and deduplicated. A `dir` that names a file has no
/// children.
pub fn list_children<'a, I>(paths: I, dir: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let dir = normalize(dir);
    let prefix = if dir == "/" {
        "/".to_string()
    } else {
        format!("{dir}/")
    };

    let mut out = BTreeSet::new();
    for p in paths {
        if let Some(rest) = p.strip_prefix(prefix.as_str()) {
            if let Some(first) = rest.split('/').next() {
                if !first.is_empty() {
                    out.insert(first.to_string());
                }
            }
        }
    }
    out.into_iter().collect()
}
