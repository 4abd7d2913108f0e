use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::{ManifoldError, ManifoldResult};
use crate::path::{normalize, strip_leading_slashes};

use super::FileTree;

/// File tree over a directory on disk.
///
/// Tree paths are mapped below `root`; a path that would climb out of it is
/// rejected rather than silently clamped. `.git` is never listed.
#[derive(Debug, Clone)]
pub struct LocalDirFileTree {
    root: PathBuf,
}

impl LocalDirFileTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_disk(&self, path: &str) -> ManifoldResult<PathBuf> {
        let raw = path.replace('\\', "/");
        if Path::new(strip_leading_slashes(&raw))
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ManifoldError::invalid_argument(format!(
                "path escapes the tree root: {path}"
            )));
        }
        let rel = normalize(&raw);
        Ok(self.root.join(strip_leading_slashes(&rel)))
    }
}

impl FileTree for LocalDirFileTree {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        let disk = self.to_disk(path)?;
        if disk.is_dir() {
            return Ok(None);
        }
        match fs::read(&disk) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ManifoldError::io(path, e)),
        }
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        let disk = self.to_disk(dir)?;
        if !disk.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&disk).map_err(|e| ManifoldError::io(dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ManifoldError::io(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name != ".git" {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn list_paths(&self) -> ManifoldResult<Vec<String>> {
        let mut out = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");

        for entry in walker {
            let entry = entry.map_err(|e| {
                let p = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "walk failed"));
                ManifoldError::io(p, io)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                out.push(normalize(&rel.to_string_lossy()));
            }
        }
        Ok(out)
    }
}
