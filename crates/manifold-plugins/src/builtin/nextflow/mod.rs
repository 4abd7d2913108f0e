//! Built-in Nextflow handler.
//!
//! The registered descriptor is `nextflow.config`. Resolution:
//! - `includeConfig` chains of the config
//! - the manifest `mainScript` (default `main.nf`) and its module includes
//! - every file directly under `lib/` and `bin/` next to the config
//!
//! The graph has one node per DSL1 process; processes depend on the
//! processes writing the channels they read.

mod config;
mod script;
mod validate;

use anyhow::Result;
use tracing::{debug, warn};

use manifold_core::closure::ImportClosure;
use manifold_core::config::ResolverConfig;
use manifold_core::context::ResolutionContext;
use manifold_core::dag::{infer_channel_dependencies, EndPolicy, GraphBuilder, TaskNode, WorkflowGraph, TOOL};
use manifold_core::docker::ImageRef;
use manifold_core::fileset::{FileType, ResolvedFileSet};
use manifold_core::filetree::FileTree;
use manifold_core::metadata::DescriptorMetadata;
use manifold_core::path::{extension, join_child, normalize, parent_dir, resolve_relative};
use manifold_core::validation::{ValidationKind, ValidationResult};
use manifold_core::{ManifoldError, ManifoldResult};

use crate::handler::{LanguageHandler, LanguageKey};
use crate::registry::HandlerRegistry;
use crate::spec::HandlerSpec;

pub use config::{ConfigScanner, NextflowConfig, DEFAULT_MAIN_SCRIPT};
pub use script::{ModuleScanner, NextflowProcess};

/// Directories next to the config whose files join every set.
const CLASSPATH_DIRS: &[&str] = &["lib", "bin"];

pub fn register(registry: &mut HandlerRegistry) -> Result<()> {
    registry.register(Box::new(NextflowHandler))
}

pub struct NextflowHandler;

impl LanguageHandler for NextflowHandler {
    fn spec(&self) -> HandlerSpec {
        HandlerSpec::new("builtin.nextflow", "Nextflow", "0.1.0", LanguageKey::new("nextflow"))
            .extension("config")
            .extension("nf")
            .want("listing", true)
            .meta("category", "workflow")
            .meta("primary", "nextflow.config")
    }

    fn detect_validity(&self, content: &str) -> bool {
        match config::parse("<content>", content) {
            Ok(c) => c.has_manifest() || !config::include_config_targets(content).is_empty(),
            Err(_) => false,
        }
    }

    fn resolve_imports(
        &self,
        tree: &dyn FileTree,
        root: &str,
        resolver: &ResolverConfig,
    ) -> ManifoldResult<ResolvedFileSet> {
        let root = normalize(root);
        let mut closure = ImportClosure::new(tree, ResolutionContext::new(resolver.limits.clone()));
        let mut set = closure.run(&ConfigScanner, &root)?;

        let main_script = config::effective(&set, &root)
            .map(|c| c.main_script().to_string())
            .unwrap_or_else(|e| {
                warn!(root = %root, error = %e, "config not parsed, assuming the default main script");
                DEFAULT_MAIN_SCRIPT.to_string()
            });
        let main_path = resolve_relative(&root, &main_script);
        if let Some(content) = closure.attach(&main_path, FileType::SecondaryDescriptor, &mut set)? {
            closure.extend(&ModuleScanner, &main_path, &content, &mut set)?;
        }

        let base = parent_dir(&root);
        let top = closure.tree().list_files(&base)?;
        for dir in CLASSPATH_DIRS.iter().filter(|d| top.iter().any(|t| t.as_str() == **d)) {
            let dir_path = join_child(&base, dir);
            for name in closure.tree().list_files(&dir_path)? {
                let path = join_child(&dir_path, &name);
                match closure.attach(&path, FileType::SecondaryDescriptor, &mut set) {
                    Ok(_) => {}
                    // binaries and unreadable entries
                    Err(e @ (ManifoldError::Io { .. } | ManifoldError::Malformed { .. })) => {
                        debug!(path = %path, error = %e, "skipping classpath entry");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(set)
    }

    fn extract_metadata(&self, content: &str) -> ManifoldResult<DescriptorMetadata> {
        let c = config::parse("<primary>", content)?;
        let mut meta = DescriptorMetadata {
            description: c.description().filter(|d| !d.trim().is_empty()).map(str::to_string),
            language_version: c.get("manifest.nextflowVersion").map(str::to_string),
            ..Default::default()
        };
        meta.push_author_list(c.author(), None);
        Ok(meta)
    }

    fn build_graph(
        &self,
        files: &ResolvedFileSet,
        root: &str,
        _config: &ResolverConfig,
    ) -> ManifoldResult<Option<WorkflowGraph>> {
        let root = normalize(root);
        let c = config::effective(files, &root)?;
        let main_path = resolve_relative(&root, c.main_script());
        let main = files
            .content(&main_path)
            .ok_or_else(|| ManifoldError::not_found(&main_path))?;

        let scripts = std::iter::once((main_path.as_str(), main)).chain(
            files
                .iter()
                .filter(|f| f.path != main_path && extension(&f.path).as_deref() == Some("nf"))
                .map(|f| (f.path.as_str(), f.content.as_str())),
        );

        let default_image = c.default_container().map(ImageRef::classify).unwrap_or(ImageRef::Absent);
        let mut builder = GraphBuilder::new();
        for (path, content) in scripts {
            for p in script::processes(content) {
                if builder.tasks().iter().any(|t| t.name == p.name) {
                    continue;
                }
                let image = p
                    .container
                    .as_deref()
                    .map(ImageRef::classify)
                    .unwrap_or_else(|| default_image.clone());
                let mut node = TaskNode::new(&p.name, TOOL).with_image(image).with_run(path);
                node.inputs = p.inputs;
                node.outputs = p.outputs;
                builder.add_task(node);
            }
        }
        infer_channel_dependencies(builder.tasks_mut());
        Ok(Some(builder.finish(EndPolicy::Leaves)))
    }

    fn validate(&self, files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
        validate::validate(files, &normalize(primary), kind)
    }
}
