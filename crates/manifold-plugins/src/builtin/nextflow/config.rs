//! `nextflow.config` scanning.
//!
//! The config is Groovy; only its assignment subset is read. Block and dotted
//! forms flatten to the same keys:
//!
//! ```text
//! manifest {                       manifest.mainScript = 'run.nf'
//!     mainScript = 'run.nf'
//! }
//! ```
//!
//! Selector blocks (`withName: foo {`, `'withLabel:big' {`) are skipped.
//! Triple-quoted values may span lines.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use manifold_core::closure::{ImportKind, ImportRef, ImportScanner};
use manifold_core::fileset::ResolvedFileSet;
use manifold_core::path::{is_url, resolve_relative};
use manifold_core::{ManifoldError, ManifoldResult};

use crate::builtin::text::{strip_comment, unquote};

pub const DEFAULT_MAIN_SCRIPT: &str = "main.nf";

fn include_config_regex() -> &'static Regex {
    static INCLUDE: OnceLock<Regex> = OnceLock::new();
    INCLUDE.get_or_init(|| Regex::new(r"(?im)^[ \t]*includeConfig(.*)").expect("valid regex"))
}

fn block_regex() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| Regex::new(r"^([A-Za-z_][\w.]*)\s*\{\s*$").expect("valid regex"))
}

fn inline_block_regex() -> &'static Regex {
    static INLINE: OnceLock<Regex> = OnceLock::new();
    INLINE.get_or_init(|| Regex::new(r"^([A-Za-z_][\w.]*)\s*\{(.*)\}$").expect("valid regex"))
}

fn assignment_regex() -> &'static Regex {
    static ASSIGN: OnceLock<Regex> = OnceLock::new();
    ASSIGN.get_or_init(|| Regex::new(r"^([A-Za-z_][\w.]*)\s*=\s*(.*)$").expect("valid regex"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextflowConfig {
    values: BTreeMap<String, String>,
    has_manifest: bool,
}

impl NextflowConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn main_script(&self) -> &str {
        self.get("manifest.mainScript")
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_MAIN_SCRIPT)
    }

    pub fn description(&self) -> Option<&str> {
        self.get("manifest.description")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("manifest.author")
    }

    /// `process.container` wins over `params.container`.
    pub fn default_container(&self) -> Option<&str> {
        self.get("process.container").or_else(|| self.get("params.container"))
    }

    pub fn has_manifest(&self) -> bool {
        self.has_manifest
    }

    /// Fold `other` in; keys already present are kept.
    pub fn merge(&mut self, other: NextflowConfig) {
        self.has_manifest |= other.has_manifest;
        for (k, v) in other.values {
            self.values.entry(k).or_insert(v);
        }
    }

    fn set(&mut self, scope: &[String], key: &str, value: String) {
        if scope.iter().any(String::is_empty) {
            return;
        }
        let full = if scope.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", scope.join("."))
        };
        if full.starts_with("manifest.") {
            self.has_manifest = true;
        }
        self.values.insert(full, value);
    }
}

/// `includeConfig` targets as written, quotes trimmed.
pub fn include_config_targets(content: &str) -> Vec<String> {
    include_config_regex()
        .captures_iter(content)
        .map(|c| unquote(strip_comment(&c[1], "//")))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Follows `includeConfig` chains.
pub struct ConfigScanner;

impl ImportScanner for ConfigScanner {
    fn scan(&self, path: &str, content: &str) -> ManifoldResult<Vec<ImportRef>> {
        Ok(include_config_targets(content)
            .into_iter()
            .map(|t| {
                if is_url(&t) {
                    ImportRef::url(ImportKind::Include, t)
                } else {
                    let p = resolve_relative(path, &t);
                    ImportRef::local(ImportKind::Include, t, p)
                }
            })
            .collect())
    }
}

/// Parse one config document.
pub fn parse(path: &str, content: &str) -> ManifoldResult<NextflowConfig> {
    let mut config = NextflowConfig::default();
    let mut scope: Vec<String> = Vec::new();
    let mut pending: Option<(String, String, &'static str)> = None;
    let mut in_comment = false;

    for raw in content.lines() {
        if let Some((key, mut buf, delim)) = pending.take() {
            match raw.find(delim) {
                Some(idx) => {
                    buf.push_str(&raw[..idx]);
                    config.set(&scope, &key, buf.trim().to_string());
                }
                None => {
                    buf.push_str(raw);
                    buf.push('\n');
                    pending = Some((key, buf, delim));
                }
            }
            continue;
        }

        let trimmed = raw.trim();
        if in_comment {
            in_comment = !trimmed.contains("*/");
            continue;
        }
        if trimmed.starts_with("/*") {
            in_comment = !trimmed.contains("*/");
            continue;
        }

        let line = strip_comment(raw, "//").trim();
        if line.is_empty() || line.to_ascii_lowercase().starts_with("includeconfig") {
            continue;
        }

        if line.starts_with('}') {
            if scope.pop().is_none() {
                return Err(ManifoldError::malformed(path, "unbalanced '}'"));
            }
            continue;
        }

        if let Some(c) = block_regex().captures(line) {
            if &c[1] == "manifest" && scope.is_empty() {
                config.has_manifest = true;
            }
            scope.push(c[1].to_string());
            continue;
        }

        if let Some(c) = inline_block_regex().captures(line) {
            scope.push(c[1].to_string());
            if let Some(a) = assignment_regex().captures(c[2].trim()) {
                config.set(&scope, &a[1], unquote(&a[2]));
            }
            scope.pop();
            continue;
        }

        if line.ends_with('{') {
            scope.push(String::new());
            continue;
        }

        if let Some(c) = assignment_regex().captures(line) {
            let key = c[1].to_string();
            let value = c[2].trim();
            match ["\"\"\"", "'''"].into_iter().find(|d| value.starts_with(d)) {
                Some(delim) => {
                    let rest = &value[delim.len()..];
                    match rest.find(delim) {
                        Some(idx) => config.set(&scope, &key, rest[..idx].trim().to_string()),
                        None => pending = Some((key, format!("{rest}\n"), delim)),
                    }
                }
                None => config.set(&scope, &key, unquote(value)),
            }
        }
    }

    if pending.is_some() {
        return Err(ManifoldError::malformed(path, "unterminated multi-line string"));
    }
    if !scope.is_empty() {
        return Err(ManifoldError::malformed(path, "unclosed block"));
    }
    Ok(config)
}

/// Config of `root` with every `includeConfig` found in the set folded in.
///
/// The including file wins over what it includes.
pub fn effective(files: &ResolvedFileSet, root: &str) -> ManifoldResult<NextflowConfig> {
    let content = files.content(root).ok_or_else(|| ManifoldError::not_found(root))?;
    let mut seen = HashSet::new();
    seen.insert(root.to_string());
    let mut config = parse(root, content)?;
    let mut queue: Vec<(String, String)> = include_config_targets(content)
        .into_iter()
        .map(|t| (root.to_string(), t))
        .collect();

    while let Some((from, target)) = queue.pop() {
        let path = resolve_relative(&from, &target);
        if !seen.insert(path.clone()) {
            continue;
        }
        let Some(text) = files.content(&path) else {
            continue;
        };
        config.merge(parse(&path, text)?);
        queue.extend(include_config_targets(text).into_iter().map(|t| (path.clone(), t)));
    }
    Ok(config)
}
