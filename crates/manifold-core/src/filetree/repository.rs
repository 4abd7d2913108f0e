//! Repository-backed file trees.
//!
//! Fetching bytes from a source-control provider is the host's job. The host
//! implements `RepositoryAccessor`; the core binds it to one repository and
//! version so resolvers only ever see a `FileTree`.

use crate::errors::ManifoldResult;
use crate::fileset::FileType;
use crate::path::normalize;

use super::FileTree;

/// Host adapter over a remote repository.
///
/// Implementations must be safe to share between concurrent resolution calls.
pub trait RepositoryAccessor: Send + Sync {
    fn read_file(
        &self,
        repository_id: &str,
        version_ref: &str,
        file_type: FileType,
        path: &str,
    ) -> ManifoldResult<Option<String>>;

    fn list_files(
        &self,
        repository_id: &str,
        dir: &str,
        version_ref: &str,
    ) -> ManifoldResult<Vec<String>>;

    /// Whether `list_files` returns real listings.
    fn supports_listing(&self) -> bool {
        true
    }
}

/// `FileTree` view of one repository at one version.
pub struct RepositoryFileTree<'a, A: ?Sized> {
    accessor: &'a A,
    repository_id: String,
    version_ref: String,
}

impl<'a, A: RepositoryAccessor + ?Sized> RepositoryFileTree<'a, A> {
    pub fn new(
        accessor: &'a A,
        repository_id: impl Into<String>,
        version_ref: impl Into<String>,
    ) -> Self {
        Self {
            accessor,
            repository_id: repository_id.into(),
            version_ref: version_ref.into(),
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn version_ref(&self) -> &str {
        &self.version_ref
    }
}

impl<A: RepositoryAccessor + ?Sized> FileTree for RepositoryFileTree<'_, A> {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        self.read_typed(path, FileType::Other)
    }

    fn read_typed(&self, path: &str, file_type: FileType) -> ManifoldResult<Option<String>> {
        self.accessor
            .read_file(&self.repository_id, &self.version_ref, file_type, &normalize(path))
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        self.accessor
            .list_files(&self.repository_id, &normalize(dir), &self.version_ref)
    }
}

/// Accessor serving a single file tree for every repository and version.
///
/// Used by the CLI (a local checkout) and by tests.
pub struct StaticAccessor<T> {
    tree: T,
}

impl<T: FileTree + Send + Sync> StaticAccessor<T> {
    pub fn new(tree: T) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }
}

impl<T: FileTree + Send + Sync> RepositoryAccessor for StaticAccessor<T> {
    fn read_file(
        &self,
        _repository_id: &str,
        _version_ref: &str,
        file_type: FileType,
        path: &str,
    ) -> ManifoldResult<Option<String>> {
        self.tree.read_typed(path, file_type)
    }

    fn list_files(
        &self,
        _repository_id: &str,
        dir: &str,
        _version_ref: &str,
    ) -> ManifoldResult<Vec<String>> {
        self.tree.list_files(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetree::InMemoryFileTree;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, String, FileType, String)>>,
    }

    impl RepositoryAccessor for Recording {
        fn read_file(
            &self,
            repository_id: &str,
            version_ref: &str,
            file_type: FileType,
            path: &str,
        ) -> ManifoldResult<Option<String>> {
            self.calls.lock().unwrap().push((
                repository_id.to_string(),
                version_ref.to_string(),
                file_type,
                path.to_string(),
            ));
            Ok(None)
        }

        fn list_files(&self, _: &str, _: &str, _: &str) -> ManifoldResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn accessor_sees_repository_version_and_type() {
        let acc = Recording::default();
        let tree = RepositoryFileTree::new(&acc, "github.com/org/wf", "main");
        tree.read_typed("tools/a.cwl", FileType::SecondaryDescriptor).unwrap();
        tree.read_file("/README.md").unwrap();

        let calls = acc.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            (
                "github.com/org/wf".to_string(),
                "main".to_string(),
                FileType::SecondaryDescriptor,
                "/tools/a.cwl".to_string()
            )
        );
        assert_eq!(calls[1].2, FileType::Other);
    }

    #[test]
    fn static_accessor_ignores_coordinates() {
        let acc = StaticAccessor::new(InMemoryFileTree::new().with_file("/a", "x"));
        let t = RepositoryFileTree::new(&acc, "any", "v1");
        assert_eq!(t.read_file("/a").unwrap().as_deref(), Some("x"));
        assert_eq!(t.list_files("/").unwrap(), vec!["a"]);
    }
}
