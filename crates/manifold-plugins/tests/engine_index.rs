//! engine_index.rs
//!
//! Runs `Engine::index` end to end over in-memory repositories, one per
//! built-in language, plus the failure modes every language shares.

use assert_matches::assert_matches;

use manifold_core::config::{LimitsConfig, ResolverConfig};
use manifold_core::docker::ImageRef;
use manifold_core::errors::Bound;
use manifold_core::fileset::FileType;
use manifold_core::filetree::{InMemoryFileTree, LocalDirFileTree, StaticAccessor};
use manifold_core::validation::ValidationKind;
use manifold_core::ManifoldError;
use manifold_plugins::{default_registry, Engine, GraphOutput, LanguageKey, ResolveRequest};

fn engine() -> Engine {
    Engine::new(default_registry().unwrap(), ResolverConfig::default()).unwrap()
}

fn engine_with(limits: LimitsConfig) -> Engine {
    let config = ResolverConfig {
        limits,
        ..Default::default()
    };
    Engine::new(default_registry().unwrap(), config).unwrap()
}

fn request(root: &str, language: LanguageKey) -> ResolveRequest {
    ResolveRequest::new("org/repo", "main", root, language)
}

fn edge(graph: &GraphOutput, source: &str, target: &str) -> bool {
    graph.edges.iter().any(|e| e.source == source && e.target == target)
}

fn cwl_repo() -> InMemoryFileTree {
    InMemoryFileTree::new()
        .with_file(
            "/main.cwl",
            r#"cwlVersion: v1.0
class: Workflow
doc: Counts and sorts words
inputs:
  text: File
outputs:
  sorted:
    type: File
    outputSource: sort/out
steps:
  count:
    run: tools/count.cwl
    in:
      src: text
    out: [out]
  sort:
    run: tools/sort.cwl
    in:
      src: count/out
    out: [out]
"#,
        )
        .with_file(
            "/tools/count.cwl",
            r#"cwlVersion: v1.0
class: CommandLineTool
baseCommand: wc
requirements:
  - class: DockerRequirement
    dockerPull: ubuntu:22.04
inputs: []
outputs: []
"#,
        )
        .with_file(
            "/tools/sort.cwl",
            "cwlVersion: v1.0\nclass: CommandLineTool\nbaseCommand: sort\ninputs: []\noutputs: []\n",
        )
        .with_file("/README.md", "not part of the workflow")
}

#[test]
fn cwl_workflow_is_indexed() {
    let accessor = StaticAccessor::new(cwl_repo());
    let report = engine()
        .index(&accessor, &request("main.cwl", LanguageKey::new("cwl")), ValidationKind::Workflow)
        .unwrap();

    assert_eq!(report.language, "cwl");
    assert_eq!(report.root_path, "/main.cwl");
    assert_eq!(report.files.len(), 3);
    assert!(!report.files.contains("/README.md"));
    assert!(report.validation.valid);
    assert_eq!(report.metadata.description.as_deref(), Some("Counts and sorts words"));
    assert_eq!(report.metadata.language_version.as_deref(), Some("v1.0"));

    let graph = report.graph.expect("graph");
    assert!(edge(&graph, "dockstore_count", "dockstore_sort"));
    let count = graph.nodes.iter().find(|n| n.name == "count").unwrap();
    assert_eq!(count.node_type, "tool");
    assert_eq!(count.image, ImageRef::classify("ubuntu:22.04"));

    // only steps with a pinned image have a registry link
    let tools = report.tools.expect("tools");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].id, "count");
    assert_eq!(tools[0].link, "https://hub.docker.com/_/ubuntu");
}

#[test]
fn cwl_tool_registered_as_workflow_is_rejected() {
    let accessor = StaticAccessor::new(cwl_repo());
    let report = engine()
        .index(
            &accessor,
            &request("/tools/sort.cwl", LanguageKey::new("cwl")),
            ValidationKind::Workflow,
        )
        .unwrap();

    assert!(!report.validation.valid);
    let msg = report.validation.message("/tools/sort.cwl").unwrap();
    assert!(msg.contains("Did you mean to register a tool?"), "{msg}");
    assert!(report.graph.is_none());
}

#[test]
fn wdl_workflow_is_indexed() {
    let tree = InMemoryFileTree::new()
        .with_file(
            "/wf/main.wdl",
            r#"version 1.0
import "tasks/align.wdl" as a
workflow align_reads {
  meta {
    author: "Ada"
    description: "Index then align"
  }
  call a.index
  call a.align { input: idx = index.out }
}
"#,
        )
        .with_file(
            "/wf/tasks/align.wdl",
            "version 1.0\ntask index {\n  command { bwa index }\n  runtime {\n    docker: \"biocontainers/bwa:0.7.17\"\n  }\n}\ntask align {\n  command { bwa mem }\n}\n",
        );
    let accessor = StaticAccessor::new(tree);
    let report = engine()
        .index(&accessor, &request("/wf/main.wdl", LanguageKey::new("wdl")), ValidationKind::Workflow)
        .unwrap();

    assert!(report.files.contains("/wf/tasks/align.wdl"));
    assert!(report.files.has_local_imports);
    assert!(report.validation.valid);
    assert_eq!(report.metadata.authors[0].name.as_deref(), Some("Ada"));
    assert_eq!(report.metadata.language_version.as_deref(), Some("1.0"));

    let graph = report.graph.expect("graph");
    assert!(edge(&graph, "dockstore_index", "dockstore_align"));
    assert!(graph.image_map.contains_key("index"));
}

#[test]
fn wdl_import_cycle_is_fatal() {
    let tree = InMemoryFileTree::new()
        .with_file("/a.wdl", "version 1.0\nimport \"b.wdl\"\nworkflow a {}\n")
        .with_file("/b.wdl", "version 1.0\nimport \"a.wdl\"\ntask t {}\n");
    let accessor = StaticAccessor::new(tree);
    let err = engine()
        .resolve(&accessor, &request("/a.wdl", LanguageKey::new("wdl")))
        .unwrap_err();

    assert_matches!(err, ManifoldError::Cycle { ref chain } if chain.first().map(String::as_str) == Some("/a.wdl"));
    assert!(err.is_fatal());
}

#[test]
fn nextflow_pipeline_is_indexed() {
    let tree = InMemoryFileTree::new()
        .with_file(
            "/nextflow.config",
            "manifest {\n  author = 'Ada'\n  description = 'Quality control'\n  nextflowVersion = '>=20.04'\n}\nprocess.container = 'org/base:1'\n",
        )
        .with_file(
            "/main.nf",
            "process trim {\n  output:\n  file 'out' into trimmed\n  \"\"\"\n  trim\n  \"\"\"\n}\nprocess report {\n  input:\n  file f from trimmed\n  \"\"\"\n  multiqc\n  \"\"\"\n}\n",
        )
        .with_file("/bin/helper.py", "print('hi')\n");
    let accessor = StaticAccessor::new(tree);
    let report = engine()
        .index(
            &accessor,
            &request("/nextflow.config", LanguageKey::new("nextflow")),
            ValidationKind::Workflow,
        )
        .unwrap();

    assert!(report.files.contains("/main.nf"));
    assert!(report.files.contains("/bin/helper.py"));
    assert!(report.validation.valid);
    assert_eq!(report.metadata.description.as_deref(), Some("Quality control"));

    let graph = report.graph.expect("graph");
    assert!(edge(&graph, "dockstore_trim", "dockstore_report"));
    assert_eq!(graph.image_map.get("trim"), Some(&ImageRef::classify("org/base:1")));
}

#[test]
fn notebook_is_indexed_with_its_environment() {
    let nb = r#"{"nbformat": 4, "nbformat_minor": 5, "cells": [],
        "metadata": {"authors": [{"name": "Ada"}], "language_info": {"name": "python"}}}"#;
    let tree = InMemoryFileTree::new()
        .with_file("/notebooks/analysis.ipynb", nb)
        .with_file("/requirements.txt", "pandas\n")
        .with_file("/binder/Dockerfile", "FROM python:3.12\n");
    let accessor = StaticAccessor::new(tree);
    let language = LanguageKey::with_subclass("jupyter", "python");
    let report = engine()
        .index(&accessor, &request("/notebooks/analysis.ipynb", language), ValidationKind::Workflow)
        .unwrap();

    assert_eq!(report.language, "jupyter/python");
    assert!(report.validation.valid);
    assert_eq!(report.metadata.language_version.as_deref(), Some("4.5"));
    assert_eq!(
        report.files.get("/binder/Dockerfile").map(|f| f.file_type),
        Some(FileType::ContainerFile)
    );
    assert!(report.files.contains("/requirements.txt"));
    assert!(report.graph.is_none());
}

#[test]
fn notebook_language_mismatch_is_invalid() {
    let nb = r#"{"nbformat": 4, "nbformat_minor": 5, "cells": [], "metadata": {"language_info": {"name": "python"}}}"#;
    let accessor = StaticAccessor::new(InMemoryFileTree::new().with_file("/nb.ipynb", nb));
    let language = LanguageKey::with_subclass("jupyter", "julia");
    let report = engine()
        .index(&accessor, &request("/nb.ipynb", language), ValidationKind::Workflow)
        .unwrap();
    assert!(!report.validation.valid);
}

#[test]
fn unknown_language_is_unsupported() {
    let accessor = StaticAccessor::new(cwl_repo());
    let err = engine()
        .resolve(&accessor, &request("/main.cwl", LanguageKey::new("snakemake")))
        .unwrap_err();
    assert_matches!(err, ManifoldError::UnsupportedLanguage { .. });
}

#[test]
fn missing_root_is_not_found() {
    let accessor = StaticAccessor::new(cwl_repo());
    let err = engine()
        .resolve(&accessor, &request("/absent.cwl", LanguageKey::new("cwl")))
        .unwrap_err();
    assert_matches!(err, ManifoldError::NotFound { .. });
    assert!(err.is_recoverable());
}

#[test]
fn file_ceiling_stops_resolution() {
    let accessor = StaticAccessor::new(cwl_repo());
    let err = engine_with(LimitsConfig::new(40, 1_000_000, 2))
        .resolve(&accessor, &request("/main.cwl", LanguageKey::new("cwl")))
        .unwrap_err();
    assert_matches!(err, ManifoldError::LimitExceeded { bound: Bound::Files, limit: 2 });
}

#[test]
fn character_ceiling_stops_resolution() {
    let accessor = StaticAccessor::new(cwl_repo());
    let err = engine_with(LimitsConfig::new(40, 64, 100))
        .resolve(&accessor, &request("/main.cwl", LanguageKey::new("cwl")))
        .unwrap_err();
    assert_matches!(err, ManifoldError::LimitExceeded { bound: Bound::Characters, .. });
}

#[test]
fn repeated_reads_hit_the_cache() {
    let accessor = StaticAccessor::new(cwl_repo());
    let report = engine()
        .index(&accessor, &request("/main.cwl", LanguageKey::new("cwl")), ValidationKind::Workflow)
        .unwrap();
    assert_eq!(report.cache.reads, 3);
}

#[test]
fn local_checkout_notebook_with_devcontainers() {
    let dir = tempfile::tempdir().unwrap();
    let nb = r#"{"nbformat": 4, "nbformat_minor": 2, "cells": [], "metadata": {"language_info": {"name": "R"}}}"#;
    for (rel, content) in [
        ("analysis.ipynb", nb),
        (".devcontainer/gpu/devcontainer.json", "{}"),
        (".devcontainer/cpu/devcontainer.json", "{}"),
        ("install.R", "install.packages('ggplot2')"),
    ] {
        let p = dir.path().join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, content).unwrap();
    }

    let accessor = StaticAccessor::new(LocalDirFileTree::new(dir.path()));
    let language = LanguageKey::with_subclass("jupyter", "r");
    let report = engine()
        .index(&accessor, &request("/analysis.ipynb", language), ValidationKind::Workflow)
        .unwrap();

    assert!(report.validation.valid);
    assert_eq!(report.files.files_of_type(FileType::ContainerFile).count(), 2);
    assert!(report.files.contains("/install.R"));
}
