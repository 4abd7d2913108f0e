//! Language handler registry.
//!
//! The registry maps language keys to handler instances. It is built once at
//! startup (`default_registry` plus any external plugins) and is read-only
//! afterwards; there is no process-wide instance.
//!
//! Lookup rules:
//! - exact `language/subclass` match first
//! - then the bare language
//! - otherwise `UnsupportedLanguage`, before any file is read

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Serialize;

use manifold_core::path::extension;
use manifold_core::{ManifoldError, ManifoldResult};

use crate::external::{LanguagePlugin, PluginLanguageHandler};
use crate::handler::{LanguageHandler, LanguageKey};
use crate::spec::HandlerSpec;

/// A handler instance plus its static spec.
pub struct RegisteredHandler {
    pub spec: HandlerSpec,
    pub handler: Box<dyn LanguageHandler>,
}

impl std::fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Listing entry for the `languages` command and API payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub key: String,
    pub extensions: Vec<String>,
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<LanguageKey, RegisteredHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn register(&mut self, handler: Box<dyn LanguageHandler>) -> anyhow::Result<()> {
        let spec = handler.spec();
        spec.validate()?;

        if self.handlers.contains_key(&spec.key) {
            anyhow::bail!("language already registered: {}", spec.key);
        }

        self.handlers
            .insert(spec.key.clone(), RegisteredHandler { spec, handler });
        Ok(())
    }

    /// Register an external plugin through the handler adapter.
    pub fn register_plugin(&mut self, plugin: Box<dyn LanguagePlugin>) -> anyhow::Result<()> {
        let name = plugin.name().to_string();
        let handler = PluginLanguageHandler::new(plugin)
            .with_context(|| format!("refusing language plugin {name}"))?;
        self.register(Box::new(handler))
    }

    pub fn get(&self, key: &LanguageKey) -> ManifoldResult<&RegisteredHandler> {
        self.handlers
            .get(key)
            .or_else(|| self.handlers.get(&key.base()))
            .ok_or_else(|| ManifoldError::unsupported(key.to_string()))
    }

    pub fn handler(&self, key: &LanguageKey) -> ManifoldResult<&dyn LanguageHandler> {
        self.get(key).map(|r| r.handler.as_ref())
    }

    /// First handler (in key order) claiming the extension of `path`.
    pub fn for_path(&self, path: &str) -> Option<&RegisteredHandler> {
        let ext = extension(path)?;
        self.handlers
            .values()
            .find(|r| r.spec.key.subclass.is_none() && r.spec.handles_extension(&ext))
    }

    pub fn keys(&self) -> Vec<LanguageKey> {
        self.handlers.keys().cloned().collect()
    }

    pub fn list(&self) -> Vec<HandlerSummary> {
        self.handlers
            .values()
            .map(|r| HandlerSummary {
                id: r.spec.id.clone(),
                name: r.spec.name.clone(),
                version: r.spec.version.clone(),
                key: r.spec.key.to_string(),
                extensions: r.spec.extensions.clone(),
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LanguageKey, &RegisteredHandler)> {
        self.handlers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifold_core::config::ResolverConfig;
    use manifold_core::dag::WorkflowGraph;
    use manifold_core::fileset::ResolvedFileSet;
    use manifold_core::filetree::FileTree;
    use manifold_core::metadata::DescriptorMetadata;
    use manifold_core::validation::{ValidationKind, ValidationResult};

    struct Dummy(LanguageKey);

    impl LanguageHandler for Dummy {
        fn spec(&self) -> HandlerSpec {
            HandlerSpec::new(format!("test.{}", self.0), "Dummy", "0.1.0", self.0.clone()).extension("dmy")
        }
        fn detect_validity(&self, _content: &str) -> bool {
            true
        }
        fn resolve_imports(&self, _: &dyn FileTree, root: &str, _: &ResolverConfig) -> ManifoldResult<ResolvedFileSet> {
            Ok(ResolvedFileSet::new(root, ""))
        }
        fn extract_metadata(&self, _: &str) -> ManifoldResult<DescriptorMetadata> {
            Ok(DescriptorMetadata::default())
        }
        fn build_graph(&self, _: &ResolvedFileSet, _: &str, _: &ResolverConfig) -> ManifoldResult<Option<WorkflowGraph>> {
            Ok(None)
        }
        fn validate(&self, _: &ResolvedFileSet, _: &str, _: ValidationKind) -> ValidationResult {
            ValidationResult::valid()
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut reg = HandlerRegistry::new();
        reg.register(Box::new(Dummy(LanguageKey::new("dummy")))).unwrap();
        reg.register(Box::new(Dummy(LanguageKey::with_subclass("dummy", "py")))).unwrap();

        let exact = reg.get(&LanguageKey::with_subclass("dummy", "py")).unwrap();
        assert_eq!(exact.spec.id, "test.dummy/py");
        let fallback = reg.get(&LanguageKey::with_subclass("dummy", "r")).unwrap();
        assert_eq!(fallback.spec.id, "test.dummy");
        assert_eq!(reg.for_path("/x/main.DMY").unwrap().spec.id, "test.dummy");
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut reg = HandlerRegistry::new();
        reg.register(Box::new(Dummy(LanguageKey::new("dummy")))).unwrap();
        assert!(reg.register(Box::new(Dummy(LanguageKey::new("dummy")))).is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_language_is_unsupported() {
        let reg = HandlerRegistry::new();
        let err = reg.handler(&LanguageKey::new("cobol")).err().unwrap();
        assert_eq!(err.code(), "UNSUPPORTED_LANGUAGE");
    }

    #[test]
    fn listing_is_ordered_by_key() {
        let mut reg = HandlerRegistry::new();
        reg.register(Box::new(Dummy(LanguageKey::new("zeta")))).unwrap();
        reg.register(Box::new(Dummy(LanguageKey::new("alpha")))).unwrap();
        let keys: Vec<String> = reg.list().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }
}
