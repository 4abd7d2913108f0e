//! Closed sets of resolved descriptor files.
//!
//! A `ResolvedFileSet` is what every import walker returns:
//! - keyed by absolute, normalized path (no two entries share a path)
//! - the primary descriptor is always present
//! - entries are only ever added; the first discovery of a path wins
//!
//! The set is itself a `FileTree`, so graph builders and metadata extraction
//! can re-run the preprocessor over it without touching the repository.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::ManifoldResult;
use crate::filetree::{list_children, FileTree};
use crate::path::normalize;

/// Role a file plays in a resolved set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    PrimaryDescriptor,
    SecondaryDescriptor,
    TestParameters,
    ContainerFile,
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryDescriptor => "primary_descriptor",
            Self::SecondaryDescriptor => "secondary_descriptor",
            Self::TestParameters => "test_parameters",
            Self::ContainerFile => "container_file",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    pub path: String,
    pub content: String,
    pub file_type: FileType,
    /// Lowercase hex SHA-256 of `content`.
    pub sha256: String,
}

impl ResolvedFile {
    pub fn new(path: impl AsRef<str>, content: impl Into<String>, file_type: FileType) -> Self {
        let content = content.into();
        let sha256 = hex::encode(Sha256::digest(content.as_bytes()));
        Self {
            path: normalize(path.as_ref()),
            content,
            file_type,
            sha256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFileSet {
    primary: String,
    files: BTreeMap<String, ResolvedFile>,
    pub has_http_imports: bool,
    pub has_local_imports: bool,
}

impl ResolvedFileSet {
    /// New set holding only the primary descriptor.
    pub fn new(primary_path: impl AsRef<str>, content: impl Into<String>) -> Self {
        let primary = ResolvedFile::new(primary_path, content, FileType::PrimaryDescriptor);
        let path = primary.path.clone();
        let mut files = BTreeMap::new();
        files.insert(path.clone(), primary);
        Self {
            primary: path,
            files,
            has_http_imports: false,
            has_local_imports: false,
        }
    }

    pub fn primary_path(&self) -> &str {
        &self.primary
    }

    pub fn primary(&self) -> &ResolvedFile {
        // The primary entry is inserted by `new` and never removed.
        &self.files[&self.primary]
    }

    /// Record a file unless its path is already present.
    ///
    /// Returns true when the file was added.
    pub fn insert_if_absent(
        &mut self,
        path: impl AsRef<str>,
        content: impl Into<String>,
        file_type: FileType,
    ) -> bool {
        let key = normalize(path.as_ref());
        if self.files.contains_key(&key) {
            return false;
        }
        self.files
            .insert(key.clone(), ResolvedFile::new(&key, content, file_type));
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }

    pub fn get(&self, path: &str) -> Option<&ResolvedFile> {
        self.files.get(&normalize(path))
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.get(path).map(|f| f.content.as_str())
    }

    pub fn files_of_type(&self, file_type: FileType) -> impl Iterator<Item = &ResolvedFile> {
        self.files.values().filter(move |f| f.file_type == file_type)
    }

    /// Every file, ordered by path.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedFile> {
        self.files.values()
    }

    /// Every file except the primary descriptor.
    pub fn secondary(&self) -> impl Iterator<Item = &ResolvedFile> {
        let primary = self.primary.as_str();
        self.files.values().filter(move |f| f.path != primary)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_chars(&self) -> u64 {
        self.files
            .values()
            .map(|f| f.content.chars().count() as u64)
            .sum()
    }

    /// Fold another set into this one; entries already present are kept.
    pub fn merge(&mut self, other: ResolvedFileSet) {
        self.has_http_imports |= other.has_http_imports;
        self.has_local_imports |= other.has_local_imports;
        for (k, v) in other.files {
            self.files.entry(k).or_insert(v);
        }
    }
}

impl FileTree for ResolvedFileSet {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        Ok(self.content(path).map(str::to_string))
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        Ok(list_children(self.files.keys().map(|k| k.as_str()), dir))
    }

    fn list_paths(&self) -> ManifoldResult<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }
}
