//! WDL workflow and tool set validation.
//!
//! Checks run in order and stop at the first failure:
//! 1. the primary descriptor exists and is not blank
//! 2. no other file of the set is blank
//! 3. no local import chain returns to a file already on it
//! 4. the declared version is one the scanner understands
//! 5. the document has the shape the kind asks for
//!
//! Every message is keyed by the primary descriptor path.

use std::collections::HashSet;

use manifold_core::fileset::{FileType, ResolvedFileSet};
use manifold_core::validation::{ValidationKind, ValidationResult};

use super::scan::{import_targets, resolve_import, scan, unsupported_version_message};
use crate::builtin::check_test_parameter_files;

pub const RECURSIVE_IMPORT: &str = "Recursive local import detected: ";

pub(crate) fn validate(files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
    match kind {
        ValidationKind::TestParams => check_test_parameter_files(files),
        ValidationKind::Workflow | ValidationKind::Tool => entry_set(files, primary, kind),
    }
}

fn entry_set(files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
    let Some(content) = files.content(primary) else {
        return ValidationResult::invalid(primary, "Primary WDL descriptor is not present.");
    };
    if content.trim().is_empty() {
        return ValidationResult::invalid(
            primary,
            format!("The primary descriptor '{primary}' has no content. Please make it a valid WDL document if you want to save."),
        );
    }

    if let Some(f) = files
        .iter()
        .find(|f| f.path != primary && f.content.trim().is_empty())
    {
        let what = match f.file_type {
            FileType::PrimaryDescriptor | FileType::SecondaryDescriptor => "a valid WDL document",
            FileType::TestParameters => "a valid WDL JSON/YAML file",
            _ => "valid",
        };
        return ValidationResult::invalid(
            primary,
            format!("File '{}' has no content. Either delete the file or make it {what}.", f.path),
        );
    }

    if let Some(path) = recursive_import(files, primary, content, &mut Vec::new()) {
        return ValidationResult::invalid(primary, format!("{RECURSIVE_IMPORT}{path}"));
    }

    if let Some(msg) = unsupported_version_message(content) {
        return ValidationResult::invalid(primary, msg);
    }

    let doc = scan(content);
    match kind {
        ValidationKind::Workflow if doc.workflow.is_none() => {
            ValidationResult::invalid(primary, "A WDL workflow requires a 'workflow' block.")
        }
        ValidationKind::Tool => {
            let tasks: HashSet<String> = files
                .iter()
                .filter(|f| matches!(f.file_type, FileType::PrimaryDescriptor | FileType::SecondaryDescriptor))
                .flat_map(|f| scan(&f.content).tasks.into_iter().map(|t| t.name))
                .collect();
            if tasks.len() == 1 {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid(
                    primary,
                    format!("A WDL tool must contain exactly one task, found {}.", tasks.len()),
                )
            }
        }
        _ => ValidationResult::valid(),
    }
}

/// First local import that re-enters the current chain.
///
/// Chains are tracked per branch: two siblings importing the same file is
/// not recursion.
fn recursive_import(
    files: &ResolvedFileSet,
    path: &str,
    content: &str,
    chain: &mut Vec<String>,
) -> Option<String> {
    chain.push(path.to_string());
    for target in import_targets(content) {
        let Some(child) = resolve_import(path, &target) else {
            continue;
        };
        if chain.contains(&child) {
            return Some(child);
        }
        if let Some(child_content) = files.content(&child) {
            if let Some(found) = recursive_import(files, &child, child_content, chain) {
                return Some(found);
            }
        }
    }
    chain.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKFLOW: &str = "version 1.0\nworkflow w {\n  call hello\n}\ntask hello {\n  command { echo hi }\n}\n";

    fn set(content: &str) -> ResolvedFileSet {
        ResolvedFileSet::new("/main.wdl", content)
    }

    #[test]
    fn workflow_and_tool_shapes() {
        assert!(validate(&set(WORKFLOW), "/main.wdl", ValidationKind::Workflow).valid);
        assert!(validate(&set(WORKFLOW), "/main.wdl", ValidationKind::Tool).valid);

        let tool_only = "version 1.0\ntask a {\n}\ntask b {\n}\n";
        let r = validate(&set(tool_only), "/main.wdl", ValidationKind::Workflow);
        assert_eq!(r.message("/main.wdl"), Some("A WDL workflow requires a 'workflow' block."));
        let r = validate(&set(tool_only), "/main.wdl", ValidationKind::Tool);
        assert_eq!(r.message("/main.wdl"), Some("A WDL tool must contain exactly one task, found 2."));
    }

    #[test]
    fn blank_files_are_reported_against_the_primary() {
        let r = validate(&set(" \n\n"), "/main.wdl", ValidationKind::Workflow);
        assert_eq!(
            r.message("/main.wdl"),
            Some("The primary descriptor '/main.wdl' has no content. Please make it a valid WDL document if you want to save.")
        );

        let mut s = set(WORKFLOW);
        s.insert_if_absent("/inputs.json", "", FileType::TestParameters);
        let r = validate(&s, "/main.wdl", ValidationKind::Workflow);
        assert_eq!(
            r.message("/main.wdl"),
            Some("File '/inputs.json' has no content. Either delete the file or make it a valid WDL JSON/YAML file.")
        );

        let r = validate(&set(WORKFLOW), "/other.wdl", ValidationKind::Workflow);
        assert_eq!(r.message("/other.wdl"), Some("Primary WDL descriptor is not present."));
    }

    #[test]
    fn recursion_is_per_branch() {
        let mut s = set("version 1.0\nimport \"a.wdl\"\nimport \"b.wdl\"\nworkflow w {}\n");
        s.insert_if_absent("/a.wdl", "version 1.0\nimport \"common.wdl\"\n", FileType::SecondaryDescriptor);
        s.insert_if_absent("/b.wdl", "version 1.0\nimport \"common.wdl\"\n", FileType::SecondaryDescriptor);
        s.insert_if_absent("/common.wdl", "version 1.0\ntask t {\n}\n", FileType::SecondaryDescriptor);
        assert!(validate(&s, "/main.wdl", ValidationKind::Workflow).valid);

        s.insert_if_absent("/sub/loop.wdl", "import \"../main.wdl\"\n", FileType::SecondaryDescriptor);
        let mut looped = set("version 1.0\nimport \"sub/loop.wdl\"\nworkflow w {}\n");
        looped.merge(s);
        let r = validate(&looped, "/main.wdl", ValidationKind::Workflow);
        assert_eq!(r.message("/main.wdl"), Some("Recursive local import detected: /main.wdl"));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let r = validate(&set("version 1.1\nworkflow w {}\n"), "/main.wdl", ValidationKind::Workflow);
        assert!(r.message("/main.wdl").unwrap().starts_with("Only WDL versions up to 1.0"));
    }
}
