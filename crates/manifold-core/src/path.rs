//! Repository path helpers.
//!
//! All paths handed to a `FileTree` are absolute (leading `/`), use forward
//! slashes and contain no `.` or `..` segments. Import targets are resolved
//! against the directory of the document that contains them.

use std::path::Path;

use path_clean::PathClean;
use url::Url;

/// True for `http://` and `https://` targets, which are never fetched.
pub fn is_url(target: &str) -> bool {
    match Url::parse(target) {
        Ok(u) => matches!(u.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Rewrite a `file:` URL into a root-absolute path.
///
/// The path of a file URL is always absolute, so `file:b`, `file://b` and
/// `file:///b` all become `/b`.
pub fn strip_file_scheme(target: &str) -> String {
    match target.strip_prefix("file:") {
        Some(rest) => format!("/{}", rest.trim_start_matches('/')),
        None => target.to_string(),
    }
}

/// Normalize any path into absolute form.
pub fn normalize(p: &str) -> String {
    let s = p.replace('\\', "/");
    let anchored = if s.starts_with('/') { s } else { format!("/{s}") };
    let cleaned = Path::new(&anchored).clean();
    let out = cleaned.to_string_lossy().replace('\\', "/");
    if out.is_empty() {
        "/".to_string()
    } else {
        out
    }
}

/// Directory containing `file_path`.
pub fn parent_dir(file_path: &str) -> String {
    let p = normalize(file_path);
    match p.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => p[..idx].to_string(),
    }
}

/// Resolve `target` as seen from the document at `parent_file`.
pub fn resolve_relative(parent_file: &str, target: &str) -> String {
    if target.starts_with('/') {
        return normalize(target);
    }
    let dir = parent_dir(parent_file);
    normalize(&format!("{}/{}", dir.trim_end_matches('/'), target))
}

/// Resolve an import target, or `None` when it must not be fetched.
pub fn resolve_import_path(parent_file: &str, target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() || is_url(target) {
        return None;
    }
    Some(resolve_relative(parent_file, &strip_file_scheme(target)))
}

/// Join a directory and an immediate child name.
pub fn join_child(dir: &str, name: &str) -> String {
    normalize(&format!("{}/{}", dir.trim_end_matches('/'), name))
}

pub fn strip_leading_slashes(p: &str) -> &str {
    p.trim_start_matches('/')
}

/// Lowercase extension of the last path segment, without the dot.
pub fn extension(p: &str) -> Option<String> {
    let name = p.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn relative_targets_follow_the_containing_document() {
        assert_eq!(resolve_relative("/a", "b"), "/b");
        assert_eq!(resolve_relative("/wf/main.cwl", "tools/x.cwl"), "/wf/tools/x.cwl");
        assert_eq!(resolve_relative("/wf/tools/x.cwl", "../common.yml"), "/wf/common.yml");
        assert_eq!(resolve_relative("/wf/main.cwl", "/abs.cwl"), "/abs.cwl");
    }

    #[test]
    fn file_urls_become_root_absolute() {
        assert_eq!(resolve_import_path("/a", "file://b"), Some("/b".to_string()));
        assert_eq!(resolve_import_path("/x/a", "file:///b"), Some("/b".to_string()));
        assert_eq!(resolve_import_path("/x/a", "file:b"), Some("/b".to_string()));
    }

    #[test]
    fn http_targets_are_not_resolved() {
        assert_eq!(resolve_import_path("/a", "http://www.foo.com/bar"), None);
        assert_eq!(resolve_import_path("/a", "https://www.foo.com/bar"), None);
        assert!(!is_url("tools/x.cwl"));
        assert!(!is_url("ftp.cwl"));
    }

    #[test]
    fn normalize_handles_odd_input() {
        assert_eq!(normalize("Dockstore.cwl"), "/Dockstore.cwl");
        assert_eq!(normalize("/a//b/./c"), "/a/b/c");
        assert_eq!(normalize("/../x"), "/x");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/dir/"), "/dir");
    }

    #[test]
    fn parent_of_top_level_file_is_root() {
        assert_eq!(parent_dir("/main.nf"), "/");
        assert_eq!(parent_dir("/a/b/main.nf"), "/a/b");
    }

    #[test]
    fn join_child_and_extension() {
        assert_eq!(join_child("/", "lib"), "/lib");
        assert_eq!(join_child("/binder/", "apt.txt"), "/binder/apt.txt");
        assert_eq!(extension("/a/Main.WDL"), Some("wdl".to_string()));
        assert_eq!(extension("/a/.binder"), None);
    }

    proptest! {
        #[test]
        fn resolved_paths_are_absolute_and_clean(
            parent in "(/[a-z]{1,4}){0,3}/[a-z]{1,4}\\.cwl",
            target in "(\\.\\./|[a-z]{1,4}/){0,4}[a-z]{1,4}\\.yml",
        ) {
            let r = resolve_relative(&parent, &target);
            prop_assert!(r.starts_with('/'));
            prop_assert!(!r.contains("/../"));
            prop_assert!(!r.contains("//"));
            prop_assert_eq!(normalize(&r), r.clone());
        }
    }
}
