//! Memoizing file tree decorator.
//!
//! Each distinct normalized path reaches the delegate at most once per
//! operation for the lifetime of the cache; `list_paths` is computed at most
//! once. Only successful answers are stored, so a failed accessor call may be
//! retried by a later caller. There is no eviction: a cache is scoped to one
//! resolution call.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::errors::ManifoldResult;
use crate::fileset::FileType;
use crate::path::normalize;

use super::FileTree;

/// Counters exposed for resolution summaries and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub reads: u64,
    pub read_hits: u64,
    pub lists: u64,
    pub list_hits: u64,
}

pub struct CachingFileTree<T> {
    inner: T,
    reads: RefCell<HashMap<String, Option<String>>>,
    lists: RefCell<HashMap<String, Vec<String>>>,
    all_paths: RefCell<Option<Vec<String>>>,
    stats: Cell<CacheStats>,
}

impl<T: FileTree> CachingFileTree<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            reads: RefCell::new(HashMap::new()),
            lists: RefCell::new(HashMap::new()),
            all_paths: RefCell::new(None),
            stats: Cell::new(CacheStats::default()),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    fn bump(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut s = self.stats.get();
        f(&mut s);
        self.stats.set(s);
    }

    fn cached_read(
        &self,
        path: &str,
        fetch: impl FnOnce(&str) -> ManifoldResult<Option<String>>,
    ) -> ManifoldResult<Option<String>> {
        let key = normalize(path);
        self.bump(|s| s.reads += 1);

        if let Some(hit) = self.reads.borrow().get(&key) {
            debug!(path = %key, "file tree cache hit");
            self.bump(|s| s.read_hits += 1);
            return Ok(hit.clone());
        }

        // The borrow above is released before the delegate runs.
        let content = fetch(&key)?;
        self.reads.borrow_mut().insert(key, content.clone());
        Ok(content)
    }
}

impl<T: FileTree> FileTree for CachingFileTree<T> {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        self.cached_read(path, |key| self.inner.read_file(key))
    }

    fn read_typed(&self, path: &str, file_type: FileType) -> ManifoldResult<Option<String>> {
        self.cached_read(path, |key| self.inner.read_typed(key, file_type))
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        let key = normalize(dir);
        self.bump(|s| s.lists += 1);

        if let Some(hit) = self.lists.borrow().get(&key) {
            debug!(dir = %key, "file tree listing cache hit");
            self.bump(|s| s.list_hits += 1);
            return Ok(hit.clone());
        }

        let names = self.inner.list_files(&key)?;
        self.lists.borrow_mut().insert(key, names.clone());
        Ok(names)
    }

    fn list_paths(&self) -> ManifoldResult<Vec<String>> {
        if let Some(all) = self.all_paths.borrow().as_ref() {
            return Ok(all.clone());
        }
        let all = self.inner.list_paths()?;
        *self.all_paths.borrow_mut() = Some(all.clone());
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ManifoldError;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Delegate that refuses to answer the same question twice.
    #[derive(Default)]
    struct OnceOnly {
        seen_reads: RefCell<HashSet<String>>,
        seen_lists: RefCell<HashSet<String>>,
        listed_all: Cell<bool>,
    }

    impl FileTree for OnceOnly {
        fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
            if !self.seen_reads.borrow_mut().insert(path.to_string()) {
                return Err(ManifoldError::Plugin(format!("second read of {path}")));
            }
            Ok(if path == "/missing" { None } else { Some(format!("content of {path}")) })
        }

        fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
            if !self.seen_lists.borrow_mut().insert(dir.to_string()) {
                return Err(ManifoldError::Plugin(format!("second listing of {dir}")));
            }
            Ok(vec!["x".to_string()])
        }

        fn list_paths(&self) -> ManifoldResult<Vec<String>> {
            if self.listed_all.replace(true) {
                return Err(ManifoldError::Plugin("second full listing".into()));
            }
            Ok(vec!["/x".to_string()])
        }
    }

    #[test]
    fn repeated_reads_hit_the_cache() {
        let t = CachingFileTree::new(OnceOnly::default());
        for _ in 0..3 {
            assert_eq!(t.read_file("/a.cwl").unwrap().as_deref(), Some("content of /a.cwl"));
        }
        // Equivalent spellings share one entry.
        t.read_file("a.cwl").unwrap();
        t.read_typed("/./a.cwl", FileType::SecondaryDescriptor).unwrap();

        let s = t.stats();
        assert_eq!(s.reads, 5);
        assert_eq!(s.read_hits, 4);
    }

    #[test]
    fn absence_is_cached_too() {
        let t = CachingFileTree::new(OnceOnly::default());
        assert_eq!(t.read_file("/missing").unwrap(), None);
        assert_eq!(t.read_file("/missing").unwrap(), None);
    }

    #[test]
    fn listings_hit_the_cache() {
        let t = CachingFileTree::new(OnceOnly::default());
        assert_eq!(t.list_files("/lib").unwrap(), vec!["x"]);
        assert_eq!(t.list_files("/lib/").unwrap(), vec!["x"]);
        assert_eq!(t.list_paths().unwrap(), vec!["/x"]);
        assert_eq!(t.list_paths().unwrap(), vec!["/x"]);
        assert_eq!(t.stats().list_hits, 1);
    }

    #[test]
    fn delegate_errors_are_not_memoized() {
        struct Flaky(Cell<u32>);
        impl FileTree for Flaky {
            fn read_file(&self, _path: &str) -> ManifoldResult<Option<String>> {
                let n = self.0.get();
                self.0.set(n + 1);
                if n == 0 {
                    Err(ManifoldError::Plugin("transient".into()))
                } else {
                    Ok(Some("ok".into()))
                }
            }
            fn list_files(&self, _dir: &str) -> ManifoldResult<Vec<String>> {
                Ok(Vec::new())
            }
        }

        let t = CachingFileTree::new(Flaky(Cell::new(0)));
        assert!(t.read_file("/a").is_err());
        assert_eq!(t.read_file("/a").unwrap().as_deref(), Some("ok"));
        assert_eq!(t.inner().0.get(), 2);
    }
}
