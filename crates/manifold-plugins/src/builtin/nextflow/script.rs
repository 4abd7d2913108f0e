//! Nextflow script scanning: module includes and DSL1 processes.

use std::sync::OnceLock;

use regex::Regex;

use manifold_core::closure::{ImportKind, ImportRef, ImportScanner};
use manifold_core::path::{is_url, resolve_relative};
use manifold_core::ManifoldResult;

use crate::builtin::text::{net_braces, strip_comment};

const SCRIPT_EXTENSION: &str = ".nf";

fn include_regex() -> &'static Regex {
    static INCLUDE: OnceLock<Regex> = OnceLock::new();
    INCLUDE.get_or_init(|| {
        Regex::new(r#"(?ms)^\s*include\b.*?\bfrom\s*['"]([^'"]+)['"]"#).expect("valid regex")
    })
}

fn process_regex() -> &'static Regex {
    static PROCESS: OnceLock<Regex> = OnceLock::new();
    PROCESS.get_or_init(|| Regex::new(r"^process\s+([A-Za-z_]\w*)\s*\{").expect("valid regex"))
}

fn container_regex() -> &'static Regex {
    static CONTAINER: OnceLock<Regex> = OnceLock::new();
    CONTAINER.get_or_init(|| Regex::new(r"^container\s*=?\s*(.+)$").expect("valid regex"))
}

fn from_regex() -> &'static Regex {
    static FROM: OnceLock<Regex> = OnceLock::new();
    FROM.get_or_init(|| Regex::new(r"\bfrom\s+([A-Za-z_]\w*)").expect("valid regex"))
}

fn into_regex() -> &'static Regex {
    static INTO: OnceLock<Regex> = OnceLock::new();
    INTO.get_or_init(|| Regex::new(r"\binto\s+(.+)$").expect("valid regex"))
}

/// Module targets as written in `include ... from '...'` statements.
pub fn include_targets(content: &str) -> Vec<String> {
    include_regex()
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

/// Script path of a module target relative to the including file.
///
/// `./` and a leading `/` are dropped and `.nf` is appended when missing.
/// Plugin and URL targets have no script.
pub fn module_path(target: &str) -> Option<String> {
    let t = target.trim();
    if t.is_empty() || is_url(t) || t.starts_with("plugin/") {
        return None;
    }
    let t = t.strip_prefix("./").unwrap_or(t).trim_start_matches('/');
    if t.ends_with(SCRIPT_EXTENSION) {
        Some(t.to_string())
    } else {
        Some(format!("{t}{SCRIPT_EXTENSION}"))
    }
}

/// Follows module includes from a script.
pub struct ModuleScanner;

impl ImportScanner for ModuleScanner {
    fn scan(&self, path: &str, content: &str) -> ManifoldResult<Vec<ImportRef>> {
        Ok(include_targets(content)
            .into_iter()
            .filter_map(|t| {
                let rel = module_path(&t)?;
                let p = resolve_relative(path, &rel);
                Some(ImportRef::local(ImportKind::Import, t, p))
            })
            .collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextflowProcess {
    pub name: String,
    /// Raw `container` directive value.
    pub container: Option<String>,
    /// Channels read with `from`.
    pub inputs: Vec<String>,
    /// Channels written with `into`.
    pub outputs: Vec<String>,
}

/// Every `process NAME {` block of a script, in order.
pub fn processes(content: &str) -> Vec<NextflowProcess> {
    let mut out = Vec::new();
    let mut open: Option<(NextflowProcess, i64)> = None;
    let mut depth: i64 = 0;
    let mut in_script = false;

    for raw in content.lines() {
        // script bodies are shell, not Groovy
        let fences = raw.matches("\"\"\"").count() + raw.matches("'''").count();
        if in_script {
            if fences % 2 == 1 {
                in_script = false;
            }
            continue;
        }
        let line = strip_comment(raw, "//").trim();
        if fences % 2 == 1 {
            in_script = true;
        }
        if line.is_empty() {
            continue;
        }

        if open.is_none() {
            if let Some(c) = process_regex().captures(line) {
                open = Some((
                    NextflowProcess {
                        name: c[1].to_string(),
                        ..Default::default()
                    },
                    depth,
                ));
            }
        } else if let Some((p, _)) = open.as_mut() {
            if let Some(c) = container_regex().captures(line) {
                p.container = Some(c[1].trim().to_string());
            }
            for c in from_regex().captures_iter(line) {
                push_unique(&mut p.inputs, &c[1]);
            }
            if let Some(c) = into_regex().captures(line) {
                for ch in c[1].split(',').map(str::trim) {
                    if !ch.is_empty() && ch.chars().all(|x| x.is_alphanumeric() || x == '_') {
                        push_unique(&mut p.outputs, ch);
                    }
                }
            }
        }

        depth += net_braces(line);
        if let Some((_, d)) = &open {
            if depth <= *d && line.contains('}') {
                if let Some((p, _)) = open.take() {
                    out.push(p);
                }
            }
        }
    }
    if let Some((p, _)) = open.take() {
        out.push(p);
    }
    out
}

fn push_unique(v: &mut Vec<String>, s: &str) {
    if !v.iter().any(|x| x == s) {
        v.push(s.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
include { ALIGN } from './modules/align'
include {
    QC;
    REPORT
} from "/modules/qc.nf"
include { validate } from 'plugin/nf-validation'

process fastqc {
    container 'biocontainers/fastqc:v0.11.9'

    input:
    file reads from read_ch

    output:
    file "*.html" into fastqc_ch, summary_ch

    script:
    """
    fastqc ${reads} | awk '{ print }'
    """
}

process multiqc {
    container "${params.multiqc_image}"
    input:
    file x from fastqc_ch.collect()
    output:
    file "report.html"
    """
    multiqc .
    """
}
"#;

    #[test]
    fn module_targets() {
        assert_eq!(
            include_targets(SCRIPT),
            vec!["./modules/align", "/modules/qc.nf", "plugin/nf-validation"]
        );
        assert_eq!(module_path("./modules/align").as_deref(), Some("modules/align.nf"));
        assert_eq!(module_path("/modules/qc.nf").as_deref(), Some("modules/qc.nf"));
        assert_eq!(module_path("plugin/nf-validation"), None);
    }

    #[test]
    fn scanner_resolves_against_the_including_file() {
        let refs = ModuleScanner.scan("/workflows/main.nf", SCRIPT).unwrap();
        let paths: Vec<_> = refs.iter().filter_map(|r| r.path.as_deref()).collect();
        assert_eq!(paths, vec!["/workflows/modules/align.nf", "/workflows/modules/qc.nf"]);
    }

    #[test]
    fn processes_and_channels() {
        let ps = processes(SCRIPT);
        assert_eq!(ps.len(), 2);
        assert_eq!(ps[0].name, "fastqc");
        assert_eq!(ps[0].container.as_deref(), Some("'biocontainers/fastqc:v0.11.9'"));
        assert_eq!(ps[0].inputs, vec!["read_ch"]);
        assert_eq!(ps[0].outputs, vec!["fastqc_ch", "summary_ch"]);
        assert_eq!(ps[1].name, "multiqc");
        assert_eq!(ps[1].inputs, vec!["fastqc_ch"]);
        assert!(ps[1].outputs.is_empty());
    }
}
