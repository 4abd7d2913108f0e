//! Built-in Jupyter notebook handler.
//!
//! A notebook has no imports. Its set is the notebook plus the environment
//! files a reproducible-execution service would read:
//! - REES files directly under `/`, `/binder/` and `/.binder/`
//! - the devcontainer definition of highest precedence: `/.devcontainer.json`,
//!   else `/.devcontainer/devcontainer.json`, else every
//!   `/.devcontainer/<folder>/devcontainer.json`
//!
//! Directories are listed before any read so absent locations cost one
//! listing, never a probe per candidate file.
//!
//! One handler is registered for `jupyter` and one per supported
//! programming language (`jupyter/python`, ...); only the latter check the
//! notebook's language.

mod format;
mod validate;

use std::collections::BTreeSet;

use anyhow::Result;

use manifold_core::closure::{ImportClosure, ImportRef};
use manifold_core::config::ResolverConfig;
use manifold_core::context::ResolutionContext;
use manifold_core::dag::WorkflowGraph;
use manifold_core::fileset::{FileType, ResolvedFileSet};
use manifold_core::filetree::FileTree;
use manifold_core::metadata::{Author, DescriptorMetadata};
use manifold_core::path::{join_child, normalize};
use manifold_core::validation::{ValidationKind, ValidationResult};
use manifold_core::{ManifoldError, ManifoldResult};

use crate::handler::{LanguageHandler, LanguageKey};
use crate::registry::HandlerRegistry;
use crate::spec::HandlerSpec;

pub use format::{Notebook, NotebookFormatError, DEFAULT_LANGUAGE};

pub const LANGUAGE: &str = "jupyter";
pub const PROGRAMMING_LANGUAGES: &[&str] = &["python", "r", "julia"];

const REES_DIRS: &[&str] = &["/", "/binder", "/.binder"];
const REES_FILES: &[&str] = &[
    "environment.yml",
    "Pipfile",
    "Pipfile.lock",
    "requirements.txt",
    "setup.py",
    "Project.toml",
    "REQUIRE",
    "install.R",
    "apt.txt",
    "DESCRIPTION",
    "postBuild",
    "start",
    "runtime.txt",
    "default.nix",
    "Dockerfile",
];
const DEVCONTAINER_FILE: &str = "devcontainer.json";

pub fn register(registry: &mut HandlerRegistry) -> Result<()> {
    registry.register(Box::new(NotebookHandler::new(None)))?;
    for lang in PROGRAMMING_LANGUAGES {
        registry.register(Box::new(NotebookHandler::new(Some(lang))))?;
    }
    Ok(())
}

pub struct NotebookHandler {
    programming_language: Option<String>,
}

impl NotebookHandler {
    pub fn new(programming_language: Option<&str>) -> Self {
        Self {
            programming_language: programming_language.map(str::to_string),
        }
    }

    fn attach_environment(
        closure: &mut ImportClosure<'_>,
        set: &mut ResolvedFileSet,
    ) -> ManifoldResult<()> {
        let tree = closure.tree();
        let root_names: BTreeSet<String> = tree.list_files("/")?.into_iter().collect();

        for dir in REES_DIRS {
            if *dir != "/" && !root_names.contains(dir.trim_start_matches('/')) {
                continue;
            }
            let names = if *dir == "/" {
                root_names.clone()
            } else {
                tree.list_files(dir)?.into_iter().collect()
            };
            for name in REES_FILES.iter().filter(|f| names.contains(**f)) {
                let file_type = if *name == "Dockerfile" {
                    FileType::ContainerFile
                } else {
                    FileType::Other
                };
                closure.attach(&join_child(dir, name), file_type, set)?;
            }
        }

        if root_names.contains(".devcontainer.json") {
            closure.attach("/.devcontainer.json", FileType::ContainerFile, set)?;
        } else if root_names.contains(".devcontainer") {
            let names = tree.list_files("/.devcontainer")?;
            if names.iter().any(|n| n == DEVCONTAINER_FILE) {
                closure.attach("/.devcontainer/devcontainer.json", FileType::ContainerFile, set)?;
            } else {
                for folder in names {
                    let folder_path = join_child("/.devcontainer", &folder);
                    if tree.list_files(&folder_path)?.iter().any(|n| n == DEVCONTAINER_FILE) {
                        closure.attach(&join_child(&folder_path, DEVCONTAINER_FILE), FileType::ContainerFile, set)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl LanguageHandler for NotebookHandler {
    fn spec(&self) -> HandlerSpec {
        let (id, name, key) = match &self.programming_language {
            Some(lang) => (
                format!("builtin.{LANGUAGE}.{lang}"),
                format!("Jupyter notebook ({lang})"),
                LanguageKey::with_subclass(LANGUAGE, lang.as_str()),
            ),
            None => (
                format!("builtin.{LANGUAGE}"),
                "Jupyter notebook".to_string(),
                LanguageKey::new(LANGUAGE),
            ),
        };
        HandlerSpec::new(id, name, "0.1.0", key)
            .extension("ipynb")
            .want("listing", true)
            .meta("category", "notebook")
    }

    fn detect_validity(&self, content: &str) -> bool {
        Notebook::parse(content).is_ok()
    }

    fn resolve_imports(
        &self,
        tree: &dyn FileTree,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<ResolvedFileSet> {
        let no_imports = |_: &str, _: &str| -> ManifoldResult<Vec<ImportRef>> { Ok(Vec::new()) };
        let mut closure = ImportClosure::new(tree, ResolutionContext::new(config.limits.clone()));
        let mut set = closure.run(&no_imports, &normalize(root))?;
        Self::attach_environment(&mut closure, &mut set)?;
        Ok(set)
    }

    fn extract_metadata(&self, content: &str) -> ManifoldResult<DescriptorMetadata> {
        let nb = Notebook::parse(content).map_err(|e| ManifoldError::malformed("<notebook>", e.to_string()))?;
        let mut meta = DescriptorMetadata {
            language_version: nb.format_version(),
            ..Default::default()
        };
        for name in nb.author_names() {
            meta.push_author(Author::named(name));
        }
        Ok(meta)
    }

    fn build_graph(
        &self,
        _files: &ResolvedFileSet,
        _root: &str,
        _config: &ResolverConfig,
    ) -> ManifoldResult<Option<WorkflowGraph>> {
        Ok(None)
    }

    fn validate(&self, files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
        validate::validate(files, &normalize(primary), kind, self.programming_language.as_deref())
    }
}
