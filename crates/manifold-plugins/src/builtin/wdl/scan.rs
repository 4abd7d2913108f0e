//! Line-based WDL scanning.
//!
//! WDL is not parsed into a syntax tree. The scanner reads just enough of a
//! document for resolution and display:
//! - `import "<target>"` statements
//! - the `version` line
//! - `task NAME {` blocks with their `runtime` docker image and `meta`
//! - `workflow NAME {` blocks with `call X [as Y]` and the calls each call
//!   reads from
//!
//! Braces are counted outside string literals; unbalanced input degrades to a
//! partial scan, never to an error.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use manifold_core::closure::{ImportKind, ImportRef, ImportScanner};
use manifold_core::docker::ImageRef;
use manifold_core::path::resolve_import_path;
use manifold_core::ManifoldResult;

use crate::builtin::text::{net_braces, strip_comment, unquote};

pub const DEFAULT_VERSION: &str = "draft-2";
pub const LATEST_SUPPORTED_VERSION: &str = "1.0";

fn import_regex() -> &'static Regex {
    static IMPORT: OnceLock<Regex> = OnceLock::new();
    IMPORT.get_or_init(|| Regex::new(r#"^import\s+"(\S+)""#).expect("valid regex"))
}

fn block_regex() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| Regex::new(r"^(task|workflow)\s+([A-Za-z_][\w]*)\s*\{?").expect("valid regex"))
}

fn call_regex() -> &'static Regex {
    static CALL: OnceLock<Regex> = OnceLock::new();
    CALL.get_or_init(|| {
        Regex::new(r"^call\s+([A-Za-z_][\w.]*)(?:\s+as\s+([A-Za-z_]\w*))?").expect("valid regex")
    })
}

fn member_regex() -> &'static Regex {
    static MEMBER: OnceLock<Regex> = OnceLock::new();
    MEMBER.get_or_init(|| Regex::new(r"\b([A-Za-z_]\w*)\.[A-Za-z_]").expect("valid regex"))
}

fn entry_regex() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| Regex::new(r"^([A-Za-z_]\w*)\s*:\s*(.+?)\s*,?$").expect("valid regex"))
}

/// Import targets as written, URLs included, in document order.
pub fn import_targets(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|l| import_regex().captures(l.trim_start()))
        .map(|c| c[1].to_string())
        .collect()
}

/// Local import target resolved against the importing file.
pub fn resolve_import(current: &str, target: &str) -> Option<String> {
    resolve_import_path(current, target)
}

pub struct WdlScanner;

impl ImportScanner for WdlScanner {
    fn scan(&self, path: &str, content: &str) -> ManifoldResult<Vec<ImportRef>> {
        Ok(import_targets(content)
            .into_iter()
            .map(|t| match resolve_import(path, &t) {
                Some(p) => ImportRef::local(ImportKind::Import, t, p),
                None => ImportRef::url(ImportKind::Import, t),
            })
            .collect())
    }
}

/// Version declared on the first code line, if any.
pub fn declared_version(content: &str) -> Option<String> {
    let first = content
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .find(|l| !l.is_empty())?;
    let parts: Vec<&str> = first.split_whitespace().collect();
    match parts.as_slice() {
        ["version", v] => Some((*v).to_string()),
        _ => None,
    }
}

pub fn language_version(content: &str) -> String {
    declared_version(content).unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// True when `version` is a numeric version newer than the latest supported.
///
/// Non-numeric versions such as `draft-3` are never newer.
pub fn is_newer_than_supported(version: &str) -> bool {
    fn parse(v: &str) -> Option<(u64, u64, u64)> {
        static NUM: OnceLock<Regex> = OnceLock::new();
        let re = NUM.get_or_init(|| Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex"));
        let c = re.captures(v)?;
        let part = |i: usize| -> Option<u64> { c.get(i).map_or(Some(0), |m| m.as_str().parse().ok()) };
        Some((part(1)?, part(2)?, part(3)?))
    }
    match (parse(version), parse(LATEST_SUPPORTED_VERSION)) {
        (Some(v), Some(latest)) => v > latest,
        _ => false,
    }
}

pub fn unsupported_version_message(content: &str) -> Option<String> {
    let v = declared_version(content)?;
    is_newer_than_supported(&v).then(|| {
        format!(
            "Only WDL versions up to {LATEST_SUPPORTED_VERSION} are supported. The version of this workflow is {v}, which cannot be verified or parsed."
        )
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WdlTask {
    pub name: String,
    /// Raw `docker` (or `container`) runtime value.
    pub docker: Option<String>,
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WdlCall {
    /// Task (possibly namespaced) being called.
    pub target: String,
    /// Call name: the alias or the last segment of the target.
    pub name: String,
    /// Identifiers read as `name.member` inside the call block.
    pub reads: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WdlWorkflow {
    pub name: String,
    pub calls: Vec<WdlCall>,
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WdlDocument {
    pub version: Option<String>,
    pub tasks: Vec<WdlTask>,
    pub workflow: Option<WdlWorkflow>,
}

impl WdlDocument {
    pub fn task(&self, name: &str) -> Option<&WdlTask> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Runtime,
    Meta,
    Other,
}

#[derive(Debug)]
enum Open {
    Task(WdlTask),
    Workflow(WdlWorkflow),
}

fn record_entry(kind: Section, block: &mut Open, line: &str) {
    let Some(c) = entry_regex().captures(line) else {
        return;
    };
    let key = c[1].to_string();
    let value = c[2].to_string();
    match (kind, block) {
        (Section::Runtime, Open::Task(t)) if key == "docker" || key == "container" => {
            t.docker = Some(value);
        }
        (Section::Meta, Open::Task(t)) => {
            t.meta.insert(key, unquote(&value));
        }
        (Section::Meta, Open::Workflow(w)) => {
            w.meta.insert(key, unquote(&value));
        }
        _ => {}
    }
}

/// Scan one WDL document.
pub fn scan(content: &str) -> WdlDocument {
    let mut doc = WdlDocument {
        version: declared_version(content),
        ..Default::default()
    };

    let mut depth: i64 = 0;
    let mut open: Option<(Open, i64)> = None;
    let mut section: Option<(Section, i64)> = None;
    let mut call: Option<(WdlCall, i64)> = None;

    for raw in content.lines() {
        let line = strip_comment(raw, "#");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if open.is_none() {
            if let Some(c) = block_regex().captures(line) {
                let name = c[2].to_string();
                let block = if &c[1] == "task" {
                    Open::Task(WdlTask {
                        name,
                        ..Default::default()
                    })
                } else {
                    Open::Workflow(WdlWorkflow {
                        name,
                        ..Default::default()
                    })
                };
                open = Some((block, depth));
            }
        } else if let Some((block, block_depth)) = open.as_mut() {
            let inner = depth - *block_depth;
            if inner == 1 && section.is_none() {
                if line.starts_with("runtime") && line.contains('{') {
                    section = Some((Section::Runtime, depth));
                } else if line.starts_with("meta") && line.contains('{') {
                    section = Some((Section::Meta, depth));
                } else if line.contains('{') && !line.starts_with("call") {
                    section = Some((Section::Other, depth));
                }
                // `runtime { docker: "x" }` on one line
                if let (Some((kind, _)), Some((_, after))) = (section, line.split_once('{')) {
                    let inline = after.trim_end().trim_end_matches('}').trim();
                    if !inline.is_empty() {
                        record_entry(kind, block, inline);
                    }
                }
            } else if let Some((kind, _)) = section {
                record_entry(kind, block, line);
            }

            if let Open::Workflow(w) = block {
                if let Some(c) = call_regex().captures(line) {
                    let target = c[1].to_string();
                    let name = c
                        .get(2)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_else(|| target.rsplit('.').next().unwrap_or(&target).to_string());
                    let mut new_call = WdlCall {
                        target,
                        name,
                        reads: Vec::new(),
                    };
                    let rest = &line[c.get(0).map_or(0, |m| m.end())..];
                    collect_reads(rest, &mut new_call.reads);
                    if net_braces(line) > 0 {
                        call = Some((new_call, depth));
                    } else {
                        w.calls.push(new_call);
                    }
                } else if let Some((c, _)) = call.as_mut() {
                    collect_reads(line, &mut c.reads);
                }
            }
        }

        depth += net_braces(line);

        if let Some((_, d)) = section {
            if depth <= d {
                section = None;
            }
        }
        if let Some((_, d)) = &call {
            if depth <= *d {
                if let (Some((c, _)), Some((Open::Workflow(w), _))) = (call.take(), open.as_mut()) {
                    w.calls.push(c);
                }
            }
        }
        if let Some((_, d)) = &open {
            if depth <= *d && line.contains('}') {
                match open.take() {
                    Some((Open::Task(t), _)) => doc.tasks.push(t),
                    Some((Open::Workflow(w), _)) => doc.workflow = Some(w),
                    None => {}
                }
            }
        }
    }

    // unterminated blocks still count
    if let Some((c, _)) = call.take() {
        if let Some((Open::Workflow(w), _)) = open.as_mut() {
            w.calls.push(c);
        }
    }
    match open.take() {
        Some((Open::Task(t), _)) => doc.tasks.push(t),
        Some((Open::Workflow(w), _)) => doc.workflow = Some(w),
        None => {}
    }
    doc
}

/// Image of a runtime value: quoted values are literals unless they
/// interpolate, bare values are expressions.
pub fn classify_runtime_image(raw: &str) -> ImageRef {
    let v = raw.trim();
    if v.starts_with('"') || v.starts_with('\'') {
        ImageRef::classify(v)
    } else {
        ImageRef::dynamic(v)
    }
}

fn collect_reads(text: &str, out: &mut Vec<String>) {
    let mut in_string = false;
    let mut clean = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '"' || ch == '\'' {
            in_string = !in_string;
            clean.push(' ');
        } else if !in_string {
            clean.push(ch);
        }
    }
    for c in member_regex().captures_iter(&clean) {
        let name = c[1].to_string();
        if !out.contains(&name) {
            out.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WF: &str = r#"
version 1.0 # comment

import "tasks/align.wdl" as align
import "https://example.org/lib.wdl"

workflow main {
  meta {
    author: "Ada, Grace"
    email: "ada@example.org, grace@example.org"
    description: "Aligns and sorts"
  }
  input {
    File reads
  }
  call align.bwa as aligner { input: reads = reads }
  call sort {
    input:
      bam = aligner.bam
  }
  output {
    File out = sort.sorted
  }
}

task sort {
  input {
    File bam
  }
  command <<<
    samtools sort ~{bam} > sorted.bam # keep braces { balanced }
  >>>
  runtime {
    docker: "quay.io/biocontainers/samtools:1.9"
    memory: "4G"
  }
}
"#;

    #[test]
    fn imports_and_version() {
        assert_eq!(import_targets(WF), vec!["tasks/align.wdl", "https://example.org/lib.wdl"]);
        assert_eq!(declared_version(WF).as_deref(), Some("1.0"));
        assert_eq!(language_version("workflow w {}"), DEFAULT_VERSION);
        assert!(is_newer_than_supported("1.1"));
        assert!(!is_newer_than_supported("development"));
        assert!(!is_newer_than_supported("draft-3"));
        assert!(!is_newer_than_supported("1.0"));
    }

    #[test]
    fn structure_scan() {
        let doc = scan(WF);
        let wf = doc.workflow.as_ref().unwrap();
        assert_eq!(wf.name, "main");
        assert_eq!(wf.meta.get("description").map(String::as_str), Some("Aligns and sorts"));

        let names: Vec<&str> = wf.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["aligner", "sort"]);
        assert_eq!(wf.calls[0].target, "align.bwa");
        assert!(wf.calls[1].reads.contains(&"aligner".to_string()));

        let sort = doc.task("sort").unwrap();
        assert_eq!(sort.docker.as_deref(), Some(r#""quay.io/biocontainers/samtools:1.9""#));
    }

    #[test]
    fn runtime_images() {
        assert!(matches!(classify_runtime_image(r#""ubuntu:20.04""#), ImageRef::Literal { .. }));
        assert!(matches!(classify_runtime_image("docker_image"), ImageRef::Dynamic { .. }));
        assert!(matches!(classify_runtime_image(r#""~{image}:latest""#), ImageRef::Dynamic { .. }));
    }
}
