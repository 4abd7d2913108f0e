//! manifold-core
//!
//! Core primitives for MANIFOLD:
//! - File tree abstraction (in-memory, local directory, repository-backed) and a
//!   memoizing decorator
//! - Descriptor documents parsed from YAML/JSON into one tagged tree
//! - Bounded, cycle-safe reference expansion (`$import`, `$include`, `$mixin`, `run`)
//! - A shared import-closure engine for text-scanned languages
//! - Container image classification and dependency graph output
//! - Validation results and descriptor metadata
//!
//! The core crate does not know any language by name beyond the generic
//! directive vocabulary. Language handlers live in `manifold-plugins`.

pub mod closure;
pub mod config;
pub mod context;
pub mod dag;
pub mod docker;
pub mod document;
pub mod errors;
pub mod fileset;
pub mod filetree;
pub mod metadata;
pub mod path;
pub mod preprocess;
pub mod validation;

pub use crate::errors::{ManifoldError, ManifoldResult};

/// Default values shared by the handlers and the host layers.
pub mod defaults {
    /// Hint class the preprocessor writes into every expanded process.
    pub const METADATA_HINT_CLASS: &str = "_dockstore_metadata";
    /// Prefix carried by every task node id in graph output.
    pub const NODE_PREFIX: &str = "dockstore_";
    /// Synthetic entry node of a workflow graph.
    pub const BEGIN_NODE: &str = "UniqueBeginKey";
    /// Synthetic exit node of a workflow graph.
    pub const END_NODE: &str = "UniqueEndKey";
}

/// Convenience re-exports.
pub mod prelude {
    pub use crate::closure::{ImportClosure, ImportKind, ImportRef, ImportScanner};
    pub use crate::config::{validate_config, LimitsConfig, PreprocessConfig, ResolverConfig};
    pub use crate::context::ResolutionContext;
    pub use crate::dag::{DependencyEdge, EndPolicy, GraphBuilder, TaskNode, ToolRow, WorkflowGraph};
    pub use crate::docker::{ImageRef, ImageSpecifier};
    pub use crate::document::{parse_document, parse_mapping};
    pub use crate::fileset::{FileType, ResolvedFile, ResolvedFileSet};
    pub use crate::filetree::{
        CachingFileTree, FileTree, InMemoryFileTree, LocalDirFileTree, RepositoryAccessor,
        RepositoryFileTree,
    };
    pub use crate::metadata::{Author, DescriptorMetadata};
    pub use crate::preprocess::Preprocessor;
    pub use crate::validation::{ValidationKind, ValidationResult};
    pub use crate::{ManifoldError, ManifoldResult};
}
