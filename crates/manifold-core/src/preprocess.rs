//! Descriptor preprocessor.
//!
//! Expands the reference directives of a root document into one in-memory
//! tree:
//! - `$import` / `import`: replaced by the parsed, preprocessed target
//! - `$include` / `include`: replaced by the raw target text
//! - `$mixin` / `mixin`: target map merged into the siblings (siblings win)
//! - `run: <string>`: implicit import, left unchanged when the target is missing
//!
//! Missing targets never fail the call: an import becomes `{}`, an include
//! becomes `""` and a mixin contributes nothing. URL targets are treated as
//! missing. Every load is counted against the configured ceilings and a path
//! that is still being expanded cannot be loaded again.
//!
//! Each expanded process (`class` is a process class) receives a metadata hint
//! recording the file it was loaded from.

use serde_json::{Map, Value};
use tracing::{debug, info_span};

use crate::config::{PreprocessConfig, ResolverConfig};
use crate::context::ResolutionContext;
use crate::document::{find_key_ci, find_string_ci, get_str, parse_document};
use crate::errors::{ManifoldError, ManifoldResult};
use crate::fileset::FileType;
use crate::filetree::FileTree;
use crate::path::{normalize, resolve_import_path, strip_leading_slashes};

pub const IMPORT_KEYS: &[&str] = &["$import", "import"];
pub const INCLUDE_KEYS: &[&str] = &["$include", "include"];
pub const MIXIN_KEYS: &[&str] = &["$mixin", "mixin"];

const PROCESS_CLASSES: &[&str] = &["Workflow", "CommandLineTool", "ExpressionTool", "Operation"];

/// True when `map` describes a process (workflow, tool or operation).
pub fn is_process(map: &Map<String, Value>) -> bool {
    get_str(map, "class").is_some_and(|c| PROCESS_CLASSES.contains(&c))
}

/// Mixins were dropped after v1.0; unknown versions keep them.
fn supports_mixin(version: Option<&str>) -> bool {
    version.map_or(true, |v| v.starts_with("v1.0"))
}

pub struct Preprocessor<'t> {
    tree: &'t dyn FileTree,
    config: PreprocessConfig,
    ctx: ResolutionContext,
}

impl<'t> Preprocessor<'t> {
    pub fn new(tree: &'t dyn FileTree, config: &ResolverConfig) -> Self {
        Self {
            tree,
            config: config.preprocess.clone(),
            ctx: ResolutionContext::new(config.limits.clone()),
        }
    }

    pub fn context(&self) -> &ResolutionContext {
        &self.ctx
    }

    /// Load, parse and expand the descriptor at `path`.
    ///
    /// A missing root is fatal.
    pub fn expand(&mut self, path: &str) -> ManifoldResult<Value> {
        let path = normalize(path);
        let _span = info_span!("preprocess", root = %path).entered();

        self.ctx.count_file()?;
        let text = self
            .tree
            .read_typed(&path, FileType::PrimaryDescriptor)?
            .ok_or_else(|| ManifoldError::not_found(&path))?;
        self.ctx.count_chars(&text)?;

        let doc = parse_document(&path, &text)?;
        self.preprocess_root(doc, &path)
    }

    /// Expand an already parsed root document located at `path`.
    pub fn preprocess_root(&mut self, doc: Value, path: &str) -> ManifoldResult<Value> {
        let path = normalize(path);
        self.ctx.enter(&path)?;
        let out = self.preprocess(doc, &path, None)?;
        self.ctx.leave();
        Ok(out)
    }

    fn preprocess(&mut self, node: Value, current: &str, version: Option<&str>) -> ManifoldResult<Value> {
        match node {
            Value::Object(map) => self.preprocess_map(map, current, version),
            Value::Array(items) => items
                .into_iter()
                .map(|v| self.preprocess(v, current, version))
                .collect::<ManifoldResult<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar),
        }
    }

    fn preprocess_map(
        &mut self,
        mut map: Map<String, Value>,
        current: &str,
        inherited: Option<&str>,
    ) -> ManifoldResult<Value> {
        let own_version = get_str(&map, "cwlVersion").map(str::to_string);
        let version = own_version.as_deref().or(inherited);

        if let Some(target) = find_string_ci(&map, IMPORT_KEYS).map(str::to_string) {
            return self.load_and_preprocess(current, &target, Value::Object(Map::new()), version);
        }

        if let Some(target) = find_string_ci(&map, INCLUDE_KEYS).map(str::to_string) {
            let text = self.load_raw(current, &target, FileType::Other)?;
            return Ok(Value::String(text.map(|(_, t)| t).unwrap_or_default()));
        }

        // Mixin entries are expanded relative to the mixin file and merged
        // only after the siblings, so they are never preprocessed twice.
        let mut origin = current.to_string();
        let mut mixed = None;
        if supports_mixin(version) {
            if let Some(target) = find_string_ci(&map, MIXIN_KEYS).map(str::to_string) {
                let resolved = resolve_import_path(current, &target);
                let mixin =
                    self.load_and_preprocess(current, &target, Value::Object(Map::new()), version)?;
                if let Value::Object(mixin) = mixin {
                    if let Some(k) = find_key_ci(&map, MIXIN_KEYS).map(str::to_string) {
                        map.shift_remove(&k);
                    }
                    if let Some(p) = resolved {
                        origin = p;
                    }
                    mixed = Some(mixin);
                }
            }
        }

        self.preprocess_map_values(&mut map, current, version)?;

        if let Some(mixin) = mixed {
            for (k, v) in mixin {
                map.entry(k).or_insert(v);
            }
        }

        if is_process(&map) {
            if self.config.assign_missing_ids && !map.contains_key("id") {
                map.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
            self.set_metadata_hint(&mut map, &origin);
        }

        Ok(Value::Object(map))
    }

    fn preprocess_map_values(
        &mut self,
        map: &mut Map<String, Value>,
        current: &str,
        version: Option<&str>,
    ) -> ManifoldResult<()> {
        // `run: {$import: x}` is the same as `run: x`.
        let run_import = match map.get("run") {
            Some(Value::Object(run)) => find_string_ci(run, IMPORT_KEYS).map(str::to_string),
            _ => None,
        };
        if let Some(target) = run_import {
            map.insert("run".to_string(), Value::String(target));
        }

        for v in map.values_mut() {
            let taken = std::mem::take(v);
            *v = self.preprocess(taken, current, version)?;
        }

        if let Some(Value::String(target)) = map.get("run").cloned() {
            let expanded =
                self.load_and_preprocess(current, &target, Value::String(target.clone()), version)?;
            map.insert("run".to_string(), expanded);
        }
        Ok(())
    }

    fn set_metadata_hint(&self, map: &mut Map<String, Value>, origin: &str) {
        let class = self.config.metadata_hint_class.as_str();
        let mut hint = Map::new();
        hint.insert("class".to_string(), Value::String(class.to_string()));
        hint.insert(
            "path".to_string(),
            Value::String(strip_leading_slashes(origin).to_string()),
        );

        match map.get_mut("hints") {
            Some(Value::Array(list)) => {
                list.retain(|h| h.get("class").and_then(Value::as_str) != Some(class));
                list.push(Value::Object(hint));
            }
            Some(Value::Object(by_class)) => {
                by_class.insert(class.to_string(), Value::Object(hint));
            }
            Some(_) => {}
            None => {
                map.insert("hints".to_string(), Value::Array(vec![Value::Object(hint)]));
            }
        }
    }

    /// Fetch the raw text of `target` as seen from `current`.
    ///
    /// Returns the resolved path with the text, or `None` when the target is
    /// a URL or missing.
    fn load_raw(
        &mut self,
        current: &str,
        target: &str,
        file_type: FileType,
    ) -> ManifoldResult<Option<(String, String)>> {
        let Some(path) = resolve_import_path(current, target) else {
            debug!(from = current, target, "url or empty target is not fetched");
            return Ok(None);
        };

        self.ctx.count_file()?;
        match self.tree.read_typed(&path, file_type)? {
            Some(text) => {
                self.ctx.count_chars(&text)?;
                Ok(Some((path, text)))
            }
            None => {
                debug!(from = current, path = %path, "referenced file not found");
                Ok(None)
            }
        }
    }

    fn load_and_preprocess(
        &mut self,
        current: &str,
        target: &str,
        not_found: Value,
        version: Option<&str>,
    ) -> ManifoldResult<Value> {
        if let Some(path) = resolve_import_path(current, target) {
            if self.ctx.is_active(&path) {
                // Reports the cycle with its chain.
                self.ctx.enter(&path)?;
            }
        }

        let Some((path, text)) = self.load_raw(current, target, FileType::SecondaryDescriptor)? else {
            return Ok(not_found);
        };
        let doc = parse_document(&path, &text)?;

        self.ctx.enter(&path)?;
        let out = self.preprocess(doc, &path, version)?;
        self.ctx.leave();
        Ok(out)
    }
}
