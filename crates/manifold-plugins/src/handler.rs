//! Language handler capability set.
//!
//! One `LanguageHandler` exists per language (and, where the language has
//! them, per subclass such as a notebook's programming language). Handlers
//! are stateless: every call receives the file tree or file set it works on
//! and creates its own resolution context.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use manifold_core::config::ResolverConfig;
use manifold_core::dag::{ToolRow, WorkflowGraph};
use manifold_core::fileset::ResolvedFileSet;
use manifold_core::filetree::FileTree;
use manifold_core::metadata::DescriptorMetadata;
use manifold_core::validation::{ValidationKind, ValidationResult};
use manifold_core::{ManifoldError, ManifoldResult};

use crate::spec::HandlerSpec;

/// Dispatch key: language plus optional subclass.
///
/// Rendered as `language` or `language/subclass`, always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LanguageKey {
    pub language: String,
    pub subclass: Option<String>,
}

impl LanguageKey {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into().to_ascii_lowercase(),
            subclass: None,
        }
    }

    pub fn with_subclass(language: impl Into<String>, subclass: impl Into<String>) -> Self {
        Self {
            language: language.into().to_ascii_lowercase(),
            subclass: Some(subclass.into().to_ascii_lowercase()),
        }
    }

    /// The same language without the subclass.
    pub fn base(&self) -> Self {
        Self::new(self.language.clone())
    }
}

impl fmt::Display for LanguageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subclass {
            Some(s) => write!(f, "{}/{}", self.language, s),
            None => f.write_str(&self.language),
        }
    }
}

impl FromStr for LanguageKey {
    type Err = ManifoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (lang, sub) = match s.split_once(['/', ':']) {
            Some((l, sub)) => (l.trim(), Some(sub.trim())),
            None => (s, None),
        };
        if lang.is_empty() {
            return Err(ManifoldError::invalid_argument("language must not be empty"));
        }
        Ok(match sub {
            Some(sub) if !sub.is_empty() => Self::with_subclass(lang, sub),
            _ => Self::new(lang),
        })
    }
}

pub trait LanguageHandler: Send + Sync {
    /// Static description used by the registry.
    fn spec(&self) -> HandlerSpec;

    fn key(&self) -> LanguageKey {
        self.spec().key
    }

    /// Cheap sniff: does `content` look like a descriptor of this language?
    fn detect_validity(&self, content: &str) -> bool;

    /// Collect the closed file set reachable from `root`.
    fn resolve_imports(
        &self,
        tree: &dyn FileTree,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<ResolvedFileSet>;

    /// Authors and description of the primary descriptor.
    fn extract_metadata(&self, content: &str) -> ManifoldResult<DescriptorMetadata>;

    /// Task graph of a resolved set, or `None` when the language has none.
    fn build_graph(
        &self,
        files: &ResolvedFileSet,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<Option<WorkflowGraph>>;

    fn tools_table(
        &self,
        files: &ResolvedFileSet,
        root: &str,
        config: &ResolverConfig,
    ) -> ManifoldResult<Option<Vec<ToolRow>>> {
        Ok(self.build_graph(files, root, config)?.map(|g| g.tools_table()))
    }

    /// Structural checks of a resolved set as a workflow, tool or test
    /// parameter set.
    fn validate(&self, files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_and_parse() {
        let k: LanguageKey = "Jupyter/Python".parse().unwrap();
        assert_eq!(k, LanguageKey::with_subclass("jupyter", "python"));
        assert_eq!(k.to_string(), "jupyter/python");
        assert_eq!(k.base(), LanguageKey::new("jupyter"));

        let k: LanguageKey = "cwl".parse().unwrap();
        assert_eq!(k.subclass, None);
        assert_eq!("notebook:r".parse::<LanguageKey>().unwrap().to_string(), "notebook/r");
        assert!("".parse::<LanguageKey>().is_err());
    }
}
