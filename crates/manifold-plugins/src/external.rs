//! External language plugins.
//!
//! A `LanguagePlugin` is the minimal surface a third-party language has to
//! provide: index the files of a workflow, read its metadata and optionally
//! validate it and render its graph. `PluginLanguageHandler` adapts a plugin
//! to the full `LanguageHandler` capability set so the registry dispatches to
//! it like any built-in language.
//!
//! Plugins are compiled against `PLUGIN_INTERFACE_VERSION`; the registry
//! refuses a plugin reporting any other version.

use std::cell::RefCell;
use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use manifold_core::config::ResolverConfig;
use manifold_core::context::ResolutionContext;
use manifold_core::dag::WorkflowGraph;
use manifold_core::fileset::{FileType, ResolvedFileSet};
use manifold_core::filetree::FileTree;
use manifold_core::metadata::DescriptorMetadata;
use manifold_core::path::normalize;
use manifold_core::validation::{ValidationKind, ValidationResult};
use manifold_core::{ManifoldError, ManifoldResult};

use crate::handler::{LanguageHandler, LanguageKey};
use crate::spec::HandlerSpec;

pub const PLUGIN_INTERFACE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{plugin}' failed: {message}")]
    Failed { plugin: String, message: String },

    #[error("plugin '{plugin}' targets interface version {found}, host provides {expected}")]
    InterfaceMismatch {
        plugin: String,
        found: u32,
        expected: u32,
    },

    #[error("plugin '{plugin}' has an invalid initial path pattern: {source}")]
    BadPattern {
        plugin: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Core(#[from] ManifoldError),
}

impl From<PluginError> for ManifoldError {
    fn from(e: PluginError) -> Self {
        match e {
            PluginError::Core(inner) => inner,
            other => ManifoldError::Plugin(other.to_string()),
        }
    }
}

/// Role of an indexed file as reported by a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericFileType {
    ImportedDescriptor,
    TestParameterFile,
    Containerfile,
}

impl From<GenericFileType> for FileType {
    fn from(t: GenericFileType) -> Self {
        match t {
            GenericFileType::ImportedDescriptor => FileType::SecondaryDescriptor,
            GenericFileType::TestParameterFile => FileType::TestParameters,
            GenericFileType::Containerfile => FileType::ContainerFile,
        }
    }
}

impl From<FileType> for GenericFileType {
    fn from(t: FileType) -> Self {
        match t {
            FileType::TestParameters => GenericFileType::TestParameterFile,
            FileType::ContainerFile => GenericFileType::Containerfile,
            _ => GenericFileType::ImportedDescriptor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFile {
    pub content: String,
    pub file_type: GenericFileType,
    pub language_version: Option<String>,
}

pub type IndexedFiles = BTreeMap<String, PluginFile>;

pub trait LanguagePlugin: Send + Sync {
    fn interface_version(&self) -> u32 {
        PLUGIN_INTERFACE_VERSION
    }

    fn language(&self) -> LanguageKey;

    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Regex the primary descriptor path must match.
    fn initial_path_pattern(&self) -> &str;

    /// Every file belonging to the workflow rooted at `initial_path`, keyed
    /// by absolute path. The primary descriptor may be omitted.
    fn index_workflow_files(
        &self,
        initial_path: &str,
        content: &str,
        reader: &dyn FileTree,
    ) -> Result<IndexedFiles, PluginError>;

    fn parse_metadata(
        &self,
        initial_path: &str,
        content: &str,
        indexed: &IndexedFiles,
    ) -> Result<DescriptorMetadata, PluginError>;

    /// `None` when the plugin does not validate.
    fn validate_workflow_set(
        &self,
        _initial_path: &str,
        _content: &str,
        _indexed: &IndexedFiles,
    ) -> Option<Result<ValidationResult, PluginError>> {
        None
    }

    /// `None` when the plugin has no graph for this workflow.
    fn cytoscape_elements(
        &self,
        _initial_path: &str,
        _content: &str,
        _indexed: &IndexedFiles,
    ) -> Result<Option<WorkflowGraph>, PluginError> {
        Ok(None)
    }
}

/// Reader handed to plugins; every read goes through the call's bounds.
struct BoundedReader<'a> {
    tree: &'a dyn FileTree,
    ctx: RefCell<ResolutionContext>,
}

impl FileTree for BoundedReader<'_> {
    fn read_file(&self, path: &str) -> ManifoldResult<Option<String>> {
        self.ctx.borrow_mut().count_file()?;
        let content = self.tree.read_file(path)?;
        if let Some(c) = &content {
            self.ctx.borrow_mut().count_chars(c)?;
        }
        Ok(content)
    }

    fn list_files(&self, dir: &str) -> ManifoldResult<Vec<String>> {
        self.tree.list_files(dir)
    }
}

pub struct PluginLanguageHandler {
    plugin: Box<dyn LanguagePlugin>,
    pattern: Regex,
}

impl PluginLanguageHandler {
    pub fn new(plugin: Box<dyn LanguagePlugin>) -> Result<Self, PluginError> {
        let found = plugin.interface_version();
        if found != PLUGIN_INTERFACE_VERSION {
            return Err(PluginError::InterfaceMismatch {
                plugin: plugin.name().to_string(),
                found,
                expected: PLUGIN_INTERFACE_VERSION,
            });
        }
        let pattern = Regex::new(plugin.initial_path_pattern()).map_err(|source| PluginError::BadPattern {
            plugin: plugin.name().to_string(),
            source,
        })?;
        Ok(Self { plugin, pattern })
    }

    pub fn plugin(&self) -> &dyn LanguagePlugin {
        self.plugin.as_ref()
    }

    fn indexed_from(files: &ResolvedFileSet) -> IndexedFiles {
        files
            .secondary()
            .map(|f| {
                (
                    f.path.clone(),
                    PluginFile {
                        content: f.content.clone(),
                        file_type: f.file_type.into(),
                        language_version: None,
                    },
                )
            })
            .collect()
    }
}

impl LanguageHandler for PluginLanguageHandler {
    fn spec(&self) -> HandlerSpec {
        let key = self.plugin.language();
        HandlerSpec::new(
            format!("plugin.{}", key.language),
            self.plugin.name(),
            self.plugin.version(),
            key,
        )
        .meta("initial_path_pattern", self.plugin.initial_path_pattern())
        .meta("interface_version", PLUGIN_INTERFACE_VERSION.to_string())
        .meta("category", "external")
    }

    fn detect_validity(&self, content: &str) -> bool {
        !content.trim().is_empty()
    }

    fn resolve_imports(
        &self,
        tree: &dyn FileTree,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<ResolvedFileSet> {
        let root = normalize(root);
        if !self.pattern.is_match(&root) {
            return Err(ManifoldError::invalid_argument(format!(
                "'{root}' does not match the initial path pattern of plugin '{}'",
                self.plugin.name()
            )));
        }

        let reader = BoundedReader {
            tree,
            ctx: RefCell::new(ResolutionContext::new(config.limits.clone())),
        };
        let content = reader
            .read_file(&root)?
            .ok_or_else(|| ManifoldError::not_found(&root))?;

        let indexed = self.plugin.index_workflow_files(&root, &content, &reader)?;
        let mut set = ResolvedFileSet::new(&root, content);
        for (path, file) in indexed {
            if !set.insert_if_absent(&path, file.content, file.file_type.into()) {
                debug!(path = %path, "plugin indexed a path twice or the primary, keeping the first");
            }
        }
        set.has_local_imports = set.len() > 1;
        Ok(set)
    }

    fn extract_metadata(&self, content: &str) -> ManifoldResult<DescriptorMetadata> {
        Ok(self.plugin.parse_metadata("", content, &IndexedFiles::new())?)
    }

    fn build_graph(
        &self,
        files: &ResolvedFileSet,
        root: &str,
        _config: &ResolverConfig,
    ) -> ManifoldResult<Option<WorkflowGraph>> {
        let Some(content) = files.content(root) else {
            return Err(ManifoldError::not_found(root));
        };
        Ok(self
            .plugin
            .cytoscape_elements(root, content, &Self::indexed_from(files))?)
    }

    fn validate(&self, files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
        if kind != ValidationKind::Workflow {
            return ValidationResult::valid();
        }
        let Some(content) = files.content(primary) else {
            return ValidationResult::invalid("Unknown", "Primary descriptor file not found.");
        };
        match self
            .plugin
            .validate_workflow_set(primary, content, &Self::indexed_from(files))
        {
            None => ValidationResult::valid(),
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                warn!(plugin = self.plugin.name(), error = %e, "plugin validation failed");
                ValidationResult::invalid(primary, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use manifold_core::filetree::InMemoryFileTree;

    /// Indexes every file named on a `needs <path>` line.
    struct NeedsPlugin {
        version: u32,
    }

    impl LanguagePlugin for NeedsPlugin {
        fn interface_version(&self) -> u32 {
            self.version
        }
        fn language(&self) -> LanguageKey {
            LanguageKey::new("needs")
        }
        fn name(&self) -> &str {
            "needs"
        }
        fn version(&self) -> &str {
            "0.1.0"
        }
        fn initial_path_pattern(&self) -> &str {
            r"\.needs$"
        }
        fn index_workflow_files(
            &self,
            _initial_path: &str,
            content: &str,
            reader: &dyn FileTree,
        ) -> Result<IndexedFiles, PluginError> {
            let mut out = IndexedFiles::new();
            for target in content.lines().filter_map(|l| l.strip_prefix("needs ")) {
                if let Some(c) = reader.read_file(target)? {
                    out.insert(
                        normalize(target),
                        PluginFile {
                            content: c,
                            file_type: GenericFileType::ImportedDescriptor,
                            language_version: None,
                        },
                    );
                }
            }
            Ok(out)
        }
        fn parse_metadata(
            &self,
            _initial_path: &str,
            content: &str,
            _indexed: &IndexedFiles,
        ) -> Result<DescriptorMetadata, PluginError> {
            Ok(DescriptorMetadata {
                description: content.lines().next().map(str::to_string),
                ..Default::default()
            })
        }
        fn validate_workflow_set(
            &self,
            initial_path: &str,
            content: &str,
            _indexed: &IndexedFiles,
        ) -> Option<Result<ValidationResult, PluginError>> {
            Some(Ok(if content.contains("needs") {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid(initial_path, "nothing needed")
            }))
        }
    }

    fn handler() -> PluginLanguageHandler {
        PluginLanguageHandler::new(Box::new(NeedsPlugin { version: PLUGIN_INTERFACE_VERSION })).unwrap()
    }

    #[test]
    fn mismatched_interface_is_refused() {
        let err = PluginLanguageHandler::new(Box::new(NeedsPlugin { version: 99 })).err().unwrap();
        assert_matches!(err, PluginError::InterfaceMismatch { found: 99, .. });
    }

    #[test]
    fn plugin_files_become_a_resolved_set() {
        let tree = InMemoryFileTree::new()
            .with_file("/main.needs", "needs /a.txt\nneeds /gone.txt\n")
            .with_file("/a.txt", "A");
        let set = handler()
            .resolve_imports(&tree, "/main.needs", &ResolverConfig::default())
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("/a.txt").unwrap().file_type, FileType::SecondaryDescriptor);
    }

    #[test]
    fn plugin_reads_are_bounded() {
        let tree = InMemoryFileTree::new()
            .with_file("/main.needs", "needs /a.txt\n")
            .with_file("/a.txt", "A");
        let mut cfg = ResolverConfig::default();
        cfg.limits.max_files = 1;
        let err = handler().resolve_imports(&tree, "/main.needs", &cfg).unwrap_err();
        assert_eq!(err.code(), "LIMIT_EXCEEDED");
    }

    #[test]
    fn root_must_match_the_pattern() {
        let tree = InMemoryFileTree::new().with_file("/main.cwl", "x");
        let err = handler()
            .resolve_imports(&tree, "/main.cwl", &ResolverConfig::default())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn validation_delegates_for_workflows_only() {
        let set = ResolvedFileSet::new("/main.needs", "empty");
        let h = handler();
        assert!(!h.validate(&set, "/main.needs", ValidationKind::Workflow).valid);
        assert!(h.validate(&set, "/main.needs", ValidationKind::Tool).valid);
        let missing = h.validate(&set, "/other.needs", ValidationKind::Workflow);
        assert_eq!(missing.message("Unknown"), Some("Primary descriptor file not found."));
    }
}
