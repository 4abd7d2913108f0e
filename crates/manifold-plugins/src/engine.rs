//! Caller entry point.
//!
//! `Engine` ties a handler registry to a resolver configuration. Every call:
//! 1. selects the handler for the requested language (fails before any I/O)
//! 2. checks the handler's wants against the accessor
//! 3. binds the accessor to the repository and version behind a fresh cache
//! 4. runs the handler's import closure under the configured bounds
//!
//! Graph building, metadata and validation work on the closed file set and
//! never go back to the accessor.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span};

use manifold_core::config::{validate_config, ResolverConfig};
use manifold_core::dag::{DependencyEdge, TaskNode, ToolRow, WorkflowGraph};
use manifold_core::docker::ImageRef;
use manifold_core::fileset::ResolvedFileSet;
use manifold_core::filetree::{CacheStats, CachingFileTree, RepositoryAccessor, RepositoryFileTree};
use manifold_core::metadata::DescriptorMetadata;
use manifold_core::path::normalize;
use manifold_core::validation::{ValidationKind, ValidationResult};
use manifold_core::{ManifoldError, ManifoldResult};

use crate::handler::{LanguageHandler, LanguageKey};
use crate::registry::HandlerRegistry;
use crate::spec::{evaluate_spec, AccessorCapabilities};

/// One resolution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveRequest {
    pub repository_id: String,
    pub version_ref: String,
    pub root_path: String,
    pub language: LanguageKey,
}

impl ResolveRequest {
    pub fn new(
        repository_id: impl Into<String>,
        version_ref: impl Into<String>,
        root_path: impl Into<String>,
        language: LanguageKey,
    ) -> Self {
        Self {
            repository_id: repository_id.into(),
            version_ref: version_ref.into(),
            root_path: normalize(&root_path.into()),
            language,
        }
    }
}

/// Graph plus the normalized image map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphOutput {
    pub nodes: Vec<TaskNode>,
    pub edges: Vec<DependencyEdge>,
    pub image_map: BTreeMap<String, ImageRef>,
}

impl GraphOutput {
    pub fn cytoscape(&self) -> Value {
        WorkflowGraph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
        .to_cytoscape_json()
    }
}

impl From<WorkflowGraph> for GraphOutput {
    fn from(g: WorkflowGraph) -> Self {
        let image_map = g.image_map();
        Self {
            nodes: g.nodes,
            edges: g.edges,
            image_map,
        }
    }
}

/// Everything `index` learns about one descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub language: String,
    pub root_path: String,
    pub files: ResolvedFileSet,
    pub metadata: DescriptorMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolRow>>,
    pub validation: ValidationResult,
    pub cache: CacheStats,
}

pub struct Engine {
    registry: HandlerRegistry,
    config: ResolverConfig,
}

impl Engine {
    pub fn new(registry: HandlerRegistry, config: ResolverConfig) -> ManifoldResult<Self> {
        validate_config(&config)?;
        Ok(Self { registry, config })
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn handler(&self, language: &LanguageKey) -> ManifoldResult<&dyn LanguageHandler> {
        self.registry.handler(language)
    }

    /// Closed file set reachable from the request's root descriptor.
    pub fn resolve(
        &self,
        accessor: &dyn RepositoryAccessor,
        req: &ResolveRequest,
    ) -> ManifoldResult<ResolvedFileSet> {
        self.resolve_with_stats(accessor, req).map(|(set, _)| set)
    }

    fn resolve_with_stats(
        &self,
        accessor: &dyn RepositoryAccessor,
        req: &ResolveRequest,
    ) -> ManifoldResult<(ResolvedFileSet, CacheStats)> {
        let lang = req.language.to_string();
        let span = info_span!("resolve", language = %lang, root = %req.root_path);
        let _enter = span.enter();

        let registered = self.registry.get(&req.language)?;
        let caps = AccessorCapabilities {
            listing: accessor.supports_listing(),
        };
        let ev = evaluate_spec(&registered.spec, &caps);
        if !ev.allowed {
            return Err(ManifoldError::invalid_argument(format!(
                "handler {} cannot run on this accessor: missing {}",
                registered.spec.id,
                ev.missing.join(", ")
            )));
        }

        let tree = CachingFileTree::new(RepositoryFileTree::new(
            accessor,
            req.repository_id.as_str(),
            req.version_ref.as_str(),
        ));
        let set = registered
            .handler
            .resolve_imports(&tree, &req.root_path, &self.config)?;
        let stats = tree.stats();

        info!(
            files = set.len(),
            chars = set.total_chars(),
            http_imports = set.has_http_imports,
            local_imports = set.has_local_imports,
            reads = stats.reads,
            read_hits = stats.read_hits,
            "resolved descriptor"
        );
        Ok((set, stats))
    }

    pub fn build_graph(
        &self,
        files: &ResolvedFileSet,
        root_path: &str,
        language: &LanguageKey,
    ) -> ManifoldResult<Option<GraphOutput>> {
        let root = normalize(root_path);
        Ok(self
            .handler(language)?
            .build_graph(files, &root, &self.config)?
            .map(GraphOutput::from))
    }

    pub fn tools_table(
        &self,
        files: &ResolvedFileSet,
        root_path: &str,
        language: &LanguageKey,
    ) -> ManifoldResult<Option<Vec<ToolRow>>> {
        let root = normalize(root_path);
        self.handler(language)?.tools_table(files, &root, &self.config)
    }

    pub fn validate(
        &self,
        files: &ResolvedFileSet,
        root_path: &str,
        language: &LanguageKey,
        kind: ValidationKind,
    ) -> ManifoldResult<ValidationResult> {
        let root = normalize(root_path);
        Ok(self.handler(language)?.validate(files, &root, kind))
    }

    pub fn metadata(&self, files: &ResolvedFileSet, language: &LanguageKey) -> ManifoldResult<DescriptorMetadata> {
        self.handler(language)?
            .extract_metadata(&files.primary().content)
    }

    /// Resolve, describe, graph and validate one descriptor.
    ///
    /// Metadata and graph failures of a descriptor that resolved are logged
    /// and left out of the report. Resolution errors, and fatal graph errors
    /// other than a malformed document, fail the call.
    pub fn index(
        &self,
        accessor: &dyn RepositoryAccessor,
        req: &ResolveRequest,
        kind: ValidationKind,
    ) -> ManifoldResult<IndexReport> {
        let (files, cache) = self.resolve_with_stats(accessor, req)?;
        let handler = self.handler(&req.language)?;
        let root = req.root_path.as_str();

        let validation = handler.validate(&files, root, kind);

        let metadata = match handler.extract_metadata(&files.primary().content) {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "metadata extraction failed");
                DescriptorMetadata::default()
            }
        };

        let (graph, tools) = if kind == ValidationKind::TestParams || !validation.valid {
            (None, None)
        } else {
            match handler.build_graph(&files, root, &self.config) {
                Ok(g) => {
                    let tools = handler.tools_table(&files, root, &self.config).unwrap_or_else(|e| {
                        debug!(error = %e, "tools table failed");
                        None
                    });
                    (g.map(GraphOutput::from), tools)
                }
                Err(e) if e.is_fatal() && !matches!(e, ManifoldError::Malformed { .. }) => return Err(e),
                Err(e) => {
                    debug!(error = %e, "graph building failed");
                    (None, None)
                }
            }
        };

        Ok(IndexReport {
            language: req.language.to_string(),
            root_path: req.root_path.clone(),
            files,
            metadata,
            graph,
            tools,
            validation,
            cache,
        })
    }

    /// Resolve independent requests concurrently.
    ///
    /// Each request owns its cache and bounds; results keep the request order.
    #[cfg(feature = "parallel")]
    pub fn resolve_many(
        &self,
        accessor: &dyn RepositoryAccessor,
        reqs: &[ResolveRequest],
    ) -> Vec<ManifoldResult<ResolvedFileSet>> {
        use rayon::prelude::*;

        reqs.par_iter().map(|r| self.resolve(accessor, r)).collect()
    }
}
