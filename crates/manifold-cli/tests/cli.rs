//! cli.rs
//!
//! Drives the `manifold` binary over checkouts written to a temp directory
//! and checks exit codes plus the JSON each subcommand prints.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, content).unwrap();
}

fn checkout() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "main.wdl",
        "version 1.0\nimport \"tasks.wdl\" as t\nworkflow hello {\n  call t.greet\n  call t.shout { input: s = greet.out }\n}\n",
    );
    write(
        dir.path(),
        "tasks.wdl",
        "version 1.0\ntask greet {\n  command { echo hi }\n  runtime {\n    docker: \"ubuntu:22.04\"\n  }\n}\ntask shout {\n  command { tr a-z A-Z }\n}\n",
    );
    write(dir.path(), "tool.cwl", "cwlVersion: v1.0\nclass: CommandLineTool\ninputs: []\noutputs: []\n");
    dir
}

fn manifold() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("manifold").unwrap()
}

fn json_of(cmd: &mut Command) -> Value {
    let out = cmd.output().unwrap();
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn resolve_lists_imported_files() {
    let dir = checkout();
    let v = json_of(manifold().arg("--json").arg("resolve").arg(dir.path()).arg("main.wdl"));

    assert_eq!(v["language"], "wdl");
    assert_eq!(v["root"], "/main.wdl");
    let paths: Vec<&str> = v["files"].as_array().unwrap().iter().map(|f| f["path"].as_str().unwrap()).collect();
    assert_eq!(paths, vec!["/main.wdl", "/tasks.wdl"]);
    assert!(v["files"][0].get("content").is_none());
}

#[test]
fn graph_prints_edges_between_calls() {
    let dir = checkout();
    let v = json_of(manifold().args(["--json", "graph"]).arg(dir.path()).arg("main.wdl"));

    let edges = v["edges"].as_array().unwrap();
    assert!(edges
        .iter()
        .any(|e| e["source"] == "dockstore_greet" && e["target"] == "dockstore_shout"));
}

#[test]
fn cytoscape_output_wraps_elements_in_data() {
    let dir = checkout();
    let v = json_of(manifold().arg("graph").arg(dir.path()).arg("main.wdl").arg("--cytoscape"));
    assert!(v["nodes"].as_array().unwrap().iter().all(|n| n["data"]["id"].is_string()));
}

#[test]
fn validate_exit_code_follows_the_result() {
    let dir = checkout();
    manifold()
        .arg("validate")
        .arg(dir.path())
        .arg("main.wdl")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));

    manifold()
        .args(["--json", "validate"])
        .arg(dir.path())
        .arg("tool.cwl")
        .args(["--kind", "workflow"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Did you mean to register a tool?"));

    manifold()
        .arg("validate")
        .arg(dir.path())
        .arg("tool.cwl")
        .args(["--kind", "tool"])
        .assert()
        .success();
}

#[test]
fn missing_root_reports_its_code() {
    let dir = checkout();
    let v = json_of(manifold().args(["--json", "resolve"]).arg(dir.path()).arg("absent.cwl"));
    assert_eq!(v["error"]["code"], "NOT_FOUND");

    manifold()
        .arg("resolve")
        .arg(dir.path())
        .arg("absent.cwl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOT_FOUND"));
}

#[test]
fn unknown_extension_needs_a_language() {
    let dir = checkout();
    manifold()
        .arg("resolve")
        .arg(dir.path())
        .arg("README")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--language"));
}

#[test]
fn file_ceiling_from_flags() {
    let dir = checkout();
    let v = json_of(
        manifold()
            .args(["--json", "--max-files", "1", "resolve"])
            .arg(dir.path())
            .arg("main.wdl"),
    );
    assert_eq!(v["error"]["code"], "LIMIT_EXCEEDED");
    assert_eq!(v["error"]["bound"], "files");
}

#[test]
fn config_file_sets_limits() {
    let dir = checkout();
    let cfg = dir.path().join("manifold.toml");
    fs::write(&cfg, "[limits]\nmax_files = 1\n").unwrap();
    manifold()
        .arg("--config")
        .arg(&cfg)
        .arg("resolve")
        .arg(dir.path())
        .arg("main.wdl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LIMIT_EXCEEDED"));
}

#[test]
fn languages_lists_builtins() {
    let v = json_of(manifold().args(["--json", "languages"]));
    let keys: Vec<&str> = v["languages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["key"].as_str().unwrap())
        .collect();
    for k in ["cwl", "wdl", "nextflow", "jupyter", "jupyter/python"] {
        assert!(keys.contains(&k), "missing {k}");
    }
}

#[test]
fn doctor_passes_with_defaults() {
    let v = json_of(manifold().args(["--json", "doctor"]));
    assert_eq!(v["ok"], true);
}

#[test]
fn index_reports_everything() {
    let dir = checkout();
    let v = json_of(manifold().args(["--json", "index"]).arg(dir.path()).arg("main.wdl"));
    assert_eq!(v["language"], "wdl");
    assert_eq!(v["validation"]["valid"], true);
    assert_eq!(v["graph"]["image_map"]["greet"]["image"], "ubuntu:22.04");
}
