//! Shared import-closure engine.
//!
//! Language walkers (WDL, Nextflow, the CWL file-set walker) only know how
//! to find references in one document. `ImportClosure` turns that into a
//! bounded, cycle-safe transitive closure:
//! - URL targets are recorded as seen but never fetched
//! - a target on the active chain is a cycle and fails the call
//! - a target already in the set is not fetched again (first discovery wins)
//! - a missing target is logged and skipped
//! - every fetch is counted against the file and character ceilings

use serde::Serialize;
use tracing::{debug, warn};

use crate::context::ResolutionContext;
use crate::errors::{ManifoldError, ManifoldResult};
use crate::fileset::{FileType, ResolvedFileSet};
use crate::filetree::FileTree;

/// Directive kind that produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Import,
    Include,
    Mixin,
    Run,
}

/// One reference found while scanning a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub kind: ImportKind,
    /// Target exactly as written.
    pub target: String,
    /// Resolved absolute path; `None` for URL targets.
    pub path: Option<String>,
    /// Type the target is recorded as.
    pub file_type: FileType,
    /// Whether the target is scanned for further references.
    pub follow: bool,
}

impl ImportRef {
    pub fn local(kind: ImportKind, target: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            path: Some(path.into()),
            file_type: FileType::SecondaryDescriptor,
            follow: true,
        }
    }

    pub fn url(kind: ImportKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            path: None,
            file_type: FileType::SecondaryDescriptor,
            follow: false,
        }
    }

    pub fn with_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    /// Record the target without scanning it.
    pub fn leaf(mut self) -> Self {
        self.follow = false;
        self
    }
}

/// Finds the references of one document.
pub trait ImportScanner {
    fn scan(&self, path: &str, content: &str) -> ManifoldResult<Vec<ImportRef>>;
}

impl<F> ImportScanner for F
where
    F: Fn(&str, &str) -> ManifoldResult<Vec<ImportRef>>,
{
    fn scan(&self, path: &str, content: &str) -> ManifoldResult<Vec<ImportRef>> {
        self(path, content)
    }
}

pub struct ImportClosure<'t> {
    tree: &'t dyn FileTree,
    ctx: ResolutionContext,
}

impl<'t> ImportClosure<'t> {
    pub fn new(tree: &'t dyn FileTree, ctx: ResolutionContext) -> Self {
        Self { tree, ctx }
    }

    pub fn context(&self) -> &ResolutionContext {
        &self.ctx
    }

    pub fn into_context(self) -> ResolutionContext {
        self.ctx
    }

    /// Resolve the closure of `root_path`.
    ///
    /// The root must exist; every other missing file is skipped.
    pub fn run(&mut self, scanner: &dyn ImportScanner, root_path: &str) -> ManifoldResult<ResolvedFileSet> {
        self.ctx.count_file()?;
        let content = self
            .tree
            .read_typed(root_path, FileType::PrimaryDescriptor)?
            .ok_or_else(|| ManifoldError::not_found(root_path))?;
        self.ctx.count_chars(&content)?;

        let mut set = ResolvedFileSet::new(root_path, content.clone());
        let root = set.primary_path().to_string();
        self.ctx.enter(&root)?;
        self.visit(scanner, &root, &content, &mut set)?;
        self.ctx.leave();
        Ok(set)
    }

    /// Continue an existing set from an already-loaded document.
    ///
    /// Used when a handler attaches several entry points (a config file and
    /// its main script) to one set.
    pub fn extend(
        &mut self,
        scanner: &dyn ImportScanner,
        path: &str,
        content: &str,
        set: &mut ResolvedFileSet,
    ) -> ManifoldResult<()> {
        self.ctx.enter(path)?;
        self.visit(scanner, path, content, set)?;
        self.ctx.leave();
        Ok(())
    }

    /// Fetch and record one file outside any scan.
    ///
    /// Returns the content when the file exists and was newly added.
    pub fn attach(
        &mut self,
        path: &str,
        file_type: FileType,
        set: &mut ResolvedFileSet,
    ) -> ManifoldResult<Option<String>> {
        if set.contains(path) {
            return Ok(None);
        }
        self.ctx.count_file()?;
        match self.tree.read_typed(path, file_type)? {
            Some(content) => {
                self.ctx.count_chars(&content)?;
                set.insert_if_absent(path, content.clone(), file_type);
                Ok(Some(content))
            }
            None => {
                debug!(path, "attached file not found, skipping");
                Ok(None)
            }
        }
    }

    pub fn tree(&self) -> &'t dyn FileTree {
        self.tree
    }

    fn visit(
        &mut self,
        scanner: &dyn ImportScanner,
        path: &str,
        content: &str,
        set: &mut ResolvedFileSet,
    ) -> ManifoldResult<()> {
        for r in scanner.scan(path, content)? {
            let Some(target) = r.path.as_deref() else {
                warn!(from = path, target = %r.target, "url import is not fetched");
                set.has_http_imports = true;
                continue;
            };
            set.has_local_imports = true;

            if r.follow && self.ctx.is_active(target) {
                // Surfaces the full chain.
                self.ctx.enter(target)?;
            }
            if set.contains(target) {
                continue;
            }

            self.ctx.count_file()?;
            let Some(child) = self.tree.read_typed(target, r.file_type)? else {
                debug!(from = path, target, "import target not found, skipping");
                continue;
            };
            self.ctx.count_chars(&child)?;
            set.insert_if_absent(target, child.clone(), r.file_type);

            if r.follow {
                self.ctx.enter(target)?;
                self.visit(scanner, target, &child, set)?;
                self.ctx.leave();
            }
        }
        Ok(())
    }
}
