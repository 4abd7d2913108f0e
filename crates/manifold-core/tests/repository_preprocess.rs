//! repository_preprocess.rs
//!
//! Expands a descriptor checked out on disk through the same stack the
//! engine uses: a local directory served by a static accessor, bound to one
//! repository version and memoized.

use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use serde_json::{json, Value};

use manifold_core::config::ResolverConfig;
use manifold_core::filetree::{CachingFileTree, LocalDirFileTree, RepositoryFileTree, StaticAccessor};
use manifold_core::preprocess::Preprocessor;
use manifold_core::ManifoldError;

fn write(root: &Path, rel: &str, content: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, content).unwrap();
}

fn checkout() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "main.cwl",
        r#"cwlVersion: v1.0
class: Workflow
doc:
  $include: README.txt
requirements:
  $import: reqs.yml
inputs: []
outputs: []
steps:
  align:
    run: tools/align.cwl
    in: []
    out: []
"#,
    );
    write(dir.path(), "README.txt", "Aligns reads");
    write(dir.path(), "reqs.yml", "- class: InlineJavascriptRequirement\n");
    write(
        dir.path(),
        "tools/align.cwl",
        "cwlVersion: v1.0\nclass: CommandLineTool\nbaseCommand: bwa\ninputs: []\noutputs: []\n",
    );
    dir
}

fn hint_paths(process: &Value) -> Vec<String> {
    process["hints"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|h| h["class"] == "_dockstore_metadata")
        .filter_map(|h| h["path"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn checkout_is_expanded_in_place() {
    let dir = checkout();
    let accessor = StaticAccessor::new(LocalDirFileTree::new(dir.path()));
    let tree = CachingFileTree::new(RepositoryFileTree::new(&accessor, "org/repo", "main"));
    let cfg = ResolverConfig::default();

    let doc = Preprocessor::new(&tree, &cfg).expand("/main.cwl").unwrap();

    assert_eq!(doc["doc"], json!("Aligns reads"));
    assert_eq!(doc["requirements"], json!([{"class": "InlineJavascriptRequirement"}]));
    assert_eq!(hint_paths(&doc), vec!["main.cwl"]);

    let run = &doc["steps"]["align"]["run"];
    assert_eq!(run["class"], json!("CommandLineTool"));
    assert_eq!(run["baseCommand"], json!("bwa"));
    assert_eq!(run["inputs"], json!([]));
    assert_eq!(hint_paths(run), vec!["tools/align.cwl"]);
}

#[test]
fn second_expansion_is_served_from_the_cache() {
    let dir = checkout();
    let accessor = StaticAccessor::new(LocalDirFileTree::new(dir.path()));
    let tree = CachingFileTree::new(RepositoryFileTree::new(&accessor, "org/repo", "main"));
    let cfg = ResolverConfig::default();

    let first = Preprocessor::new(&tree, &cfg).expand("/main.cwl").unwrap();
    let after_first = tree.stats();
    assert_eq!(after_first.read_hits, 0);

    let second = Preprocessor::new(&tree, &cfg).expand("main.cwl").unwrap();
    let after_second = tree.stats();
    assert_eq!(first, second);
    assert_eq!(after_second.reads, after_first.reads * 2);
    assert_eq!(after_second.read_hits, after_first.reads);
}

#[test]
fn import_loops_on_disk_are_reported_with_their_chain() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "loop.cwl", "cwlVersion: v1.0\nclass: Workflow\nsteps:\n  $import: steps.yml\n");
    write(dir.path(), "steps.yml", "$import: loop.cwl\n");
    let accessor = StaticAccessor::new(LocalDirFileTree::new(dir.path()));
    let tree = RepositoryFileTree::new(&accessor, "org/repo", "main");

    let err = Preprocessor::new(&tree, &ResolverConfig::default())
        .expand("/loop.cwl")
        .unwrap_err();
    assert_matches!(err, ManifoldError::Cycle { ref chain } if *chain == ["/loop.cwl", "/steps.yml", "/loop.cwl"]);
}

#[test]
fn missing_root_on_disk_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = StaticAccessor::new(LocalDirFileTree::new(dir.path()));
    let tree = RepositoryFileTree::new(&accessor, "org/repo", "main");
    let err = Preprocessor::new(&tree, &ResolverConfig::default())
        .expand("/absent.cwl")
        .unwrap_err();
    assert_matches!(err, ManifoldError::NotFound { .. });
}
