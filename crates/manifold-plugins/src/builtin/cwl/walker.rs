//! CWL file-set walker.
//!
//! Collects every file a CWL descriptor can reach without expanding it:
//! - string values of `$import`, `$include`, `$mixin` (bare forms too, any case)
//! - `run` strings
//! - `run` maps and any other nested node are searched recursively
//!
//! Included files are recorded but not scanned, since their text is never
//! parsed as CWL.

use serde_json::Value;

use manifold_core::closure::{ImportKind, ImportRef, ImportScanner};
use manifold_core::document::parse_document;
use manifold_core::path::{is_url, resolve_import_path};
use manifold_core::preprocess::{IMPORT_KEYS, INCLUDE_KEYS, MIXIN_KEYS};
use manifold_core::ManifoldResult;

pub struct CwlScanner;

impl ImportScanner for CwlScanner {
    fn scan(&self, path: &str, content: &str) -> ManifoldResult<Vec<ImportRef>> {
        let doc = parse_document(path, content)?;
        let mut out = Vec::new();
        collect(path, &doc, &mut out);
        Ok(out)
    }
}

fn directive(key: &str) -> Option<ImportKind> {
    let k = key.to_lowercase();
    let k = k.as_str();
    if IMPORT_KEYS.contains(&k) {
        Some(ImportKind::Import)
    } else if INCLUDE_KEYS.contains(&k) {
        Some(ImportKind::Include)
    } else if MIXIN_KEYS.contains(&k) {
        Some(ImportKind::Mixin)
    } else if k == "run" {
        Some(ImportKind::Run)
    } else {
        None
    }
}

fn reference(kind: ImportKind, current: &str, target: &str) -> Option<ImportRef> {
    let target = target.trim();
    if target.is_empty() || target.starts_with('#') {
        // `#id` points into a packed `$graph`, not at a file
        return None;
    }
    if is_url(target) {
        return Some(ImportRef::url(kind, target));
    }
    let path = resolve_import_path(current, target)?;
    let r = ImportRef::local(kind, target, path);
    Some(if kind == ImportKind::Include { r.leaf() } else { r })
}

fn collect(current: &str, node: &Value, out: &mut Vec<ImportRef>) {
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                match (directive(k), v) {
                    (Some(kind), Value::String(target)) => {
                        out.extend(reference(kind, current, target));
                    }
                    (Some(ImportKind::Run), other) => collect(current, other, out),
                    // a directive with a non-string value is not a reference
                    (Some(_), _) => {}
                    (None, other) => collect(current, other, out),
                }
            }
        }
        Value::Array(items) => {
            for v in items {
                collect(current, v, out);
            }
        }
        _ => {}
    }
}
