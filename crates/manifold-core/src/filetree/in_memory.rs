use std::collections::BTreeMap;

use crate::errors::ManifoldResult;
use crate::path::normalize;

use super::{list_children, FileTree};

/// File tree held entirely in memory, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileTree {
    files: BTreeMap<String, String>,
}

impl InMemoryFileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl AsRef<str>, content: impl Into<String>) -> &mut Self {
        self.files.insert(normalize(path.as_ref()), content.into());
        self
    }

    pub fn with_file(mut self, path: impl AsRef<str>, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P: AsRef<str>, C: Into<String>> FromIterator<(P, C)> for InMemoryFileTree {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut tree = Self::new();
        for (p, c) in iter {
            tree.add_file(p, c);
        }
        tree
    }
}

impl FileTree for InMemoryFileTree {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        Ok(self.files.get(&normalize(path)).cloned())
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        Ok(list_children(self.files.keys().map(|k| k.as_str()), dir))
    }

    fn list_paths(&self) -> ManifoldResult<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> InMemoryFileTree {
        InMemoryFileTree::new()
            .with_file("main.nf", "workflow {}")
            .with_file("/lib/Utils.groovy", "class Utils {}")
            .with_file("/modules/a/main.nf", "process A {}")
    }

    #[test]
    fn reads_normalize_the_path() {
        let t = tree();
        assert_eq!(t.read_file("/main.nf").unwrap().as_deref(), Some("workflow {}"));
        assert_eq!(t.read_file("lib//Utils.groovy").unwrap().as_deref(), Some("class Utils {}"));
    }

    #[test]
    fn directories_are_not_files() {
        let t = tree();
        assert_eq!(t.read_file("/lib").unwrap(), None);
        assert!(t.list_files("/main.nf").unwrap().is_empty());
    }

    #[test]
    fn root_lists_files_and_directories() {
        let t = tree();
        assert_eq!(t.list_files("/").unwrap(), vec!["lib", "main.nf", "modules"]);
        assert_eq!(t.list_files("/modules").unwrap(), vec!["a"]);
        assert_eq!(t.list_paths().unwrap().len(), 3);
    }
}
