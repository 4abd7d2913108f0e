//! Built-in WDL handler.
//!
//! Responsibilities:
//! - collect the set reachable through local `import` statements
//! - build the call graph from a line-based scan of the set
//! - read workflow (or task) `meta` authors and description
//! - validate workflow, tool and test parameter sets

mod graph;
mod scan;
mod validate;

use anyhow::Result;

use manifold_core::closure::ImportClosure;
use manifold_core::config::ResolverConfig;
use manifold_core::context::ResolutionContext;
use manifold_core::dag::WorkflowGraph;
use manifold_core::fileset::ResolvedFileSet;
use manifold_core::filetree::FileTree;
use manifold_core::metadata::DescriptorMetadata;
use manifold_core::path::normalize;
use manifold_core::validation::{ValidationKind, ValidationResult};
use manifold_core::ManifoldResult;

use crate::handler::{LanguageHandler, LanguageKey};
use crate::registry::HandlerRegistry;
use crate::spec::HandlerSpec;

pub use scan::{declared_version, WdlScanner, DEFAULT_VERSION, LATEST_SUPPORTED_VERSION};

pub fn register(registry: &mut HandlerRegistry) -> Result<()> {
    registry.register(Box::new(WdlHandler))
}

pub struct WdlHandler;

impl LanguageHandler for WdlHandler {
    fn spec(&self) -> HandlerSpec {
        HandlerSpec::new("builtin.wdl", "Workflow Description Language", "0.1.0", LanguageKey::new("wdl"))
            .extension("wdl")
            .want("listing", false)
            .meta("category", "workflow")
            .meta("latest_supported_version", LATEST_SUPPORTED_VERSION)
    }

    fn detect_validity(&self, content: &str) -> bool {
        if declared_version(content).is_some() {
            return true;
        }
        let doc = scan::scan(content);
        doc.workflow.is_some() || !doc.tasks.is_empty()
    }

    fn resolve_imports(
        &self,
        tree: &dyn FileTree,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<ResolvedFileSet> {
        let mut closure = ImportClosure::new(tree, ResolutionContext::new(config.limits.clone()));
        closure.run(&WdlScanner, &normalize(root))
    }

    fn extract_metadata(&self, content: &str) -> ManifoldResult<DescriptorMetadata> {
        let doc = scan::scan(content);
        let meta = doc
            .workflow
            .as_ref()
            .map(|w| &w.meta)
            .filter(|m| !m.is_empty())
            .or_else(|| doc.tasks.iter().map(|t| &t.meta).find(|m| !m.is_empty()));

        let mut out = DescriptorMetadata {
            language_version: Some(scan::language_version(content)),
            ..Default::default()
        };
        if let Some(m) = meta {
            out.push_author_list(m.get("author").map(String::as_str), m.get("email").map(String::as_str));
            out.description = m.get("description").filter(|d| !d.trim().is_empty()).cloned();
        }
        Ok(out)
    }

    fn build_graph(
        &self,
        files: &ResolvedFileSet,
        root: &str,
        _config: &ResolverConfig,
    ) -> ManifoldResult<Option<WorkflowGraph>> {
        Ok(Some(graph::build(files, &normalize(root))?))
    }

    fn validate(&self, files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
        validate::validate(files, &normalize(primary), kind)
    }
}
