//! Built-in CWL handler.
//!
//! Responsibilities:
//! - collect the file set reachable through imports, includes, mixins and
//!   `run` targets
//! - expand the root against that set to build the step graph and tools table
//! - read `doc`/`label` and schema.org / Dublin Core authors
//! - validate workflow, tool and test parameter sets
//!
//! Expansion never goes back to the repository: the resolved set is the file
//! tree of every later step.

#![cfg(feature = "builtin")]

mod graph;
mod metadata;
mod validate;
mod walker;

use anyhow::Result;

use manifold_core::closure::ImportClosure;
use manifold_core::config::ResolverConfig;
use manifold_core::context::ResolutionContext;
use manifold_core::dag::{ToolRow, WorkflowGraph};
use manifold_core::document::parse_document;
use manifold_core::fileset::ResolvedFileSet;
use manifold_core::filetree::FileTree;
use manifold_core::metadata::DescriptorMetadata;
use manifold_core::path::normalize;
use manifold_core::validation::{ValidationKind, ValidationResult};
use manifold_core::ManifoldResult;

use crate::handler::{LanguageHandler, LanguageKey};
use crate::registry::HandlerRegistry;
use crate::spec::HandlerSpec;

pub use walker::CwlScanner;

pub fn register(registry: &mut HandlerRegistry) -> Result<()> {
    registry.register(Box::new(CwlHandler))
}

pub struct CwlHandler;

impl LanguageHandler for CwlHandler {
    fn spec(&self) -> HandlerSpec {
        HandlerSpec::new("builtin.cwl", "Common Workflow Language", "0.1.0", LanguageKey::new("cwl"))
            .extension("cwl")
            .want("listing", false)
            .meta("category", "workflow")
    }

    fn detect_validity(&self, content: &str) -> bool {
        match parse_document("<content>", content) {
            Ok(doc) => doc
                .as_object()
                .is_some_and(|m| m.contains_key("class") || m.contains_key("$graph")),
            Err(_) => false,
        }
    }

    fn resolve_imports(
        &self,
        tree: &dyn FileTree,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<ResolvedFileSet> {
        let mut closure = ImportClosure::new(tree, ResolutionContext::new(config.limits.clone()));
        closure.run(&CwlScanner, &normalize(root))
    }

    fn extract_metadata(&self, content: &str) -> ManifoldResult<DescriptorMetadata> {
        metadata::extract(content)
    }

    fn build_graph(
        &self,
        files: &ResolvedFileSet,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<Option<WorkflowGraph>> {
        Ok(Some(graph::walk(files, root, config)?.graph()))
    }

    /// Tools at any depth, subworkflow steps included.
    fn tools_table(
        &self,
        files: &ResolvedFileSet,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<Option<Vec<ToolRow>>> {
        Ok(Some(graph::walk(files, root, config)?.all_steps().tools_table()))
    }

    fn validate(&self, files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
        validate::validate(files, &normalize(primary), kind)
    }
}
