//! CWL workflow and tool set validation.
//!
//! Only the primary descriptor is checked structurally: it must exist, be
//! non-blank, parse, carry the class the kind asks for and declare a `v1`
//! version. Test parameter sets are checked file by file.

use manifold_core::document::{get_str, parse_mapping};
use manifold_core::fileset::ResolvedFileSet;
use manifold_core::validation::{ValidationKind, ValidationResult};

use super::graph::{main_process, VERSION_PREFIX};
use crate::builtin::check_test_parameter_files;

const WORKFLOW_CLASSES: &[&str] = &["Workflow"];
const TOOL_CLASSES: &[&str] = &["CommandLineTool", "ExpressionTool", "Operation"];

pub(crate) fn validate(files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
    match kind {
        ValidationKind::Workflow => process_set(files, primary, "workflow", WORKFLOW_CLASSES, "tool", TOOL_CLASSES),
        ValidationKind::Tool => process_set(files, primary, "tool", TOOL_CLASSES, "workflow", WORKFLOW_CLASSES),
        ValidationKind::TestParams => check_test_parameter_files(files),
    }
}

fn process_set(
    files: &ResolvedFileSet,
    primary: &str,
    process_type: &str,
    classes: &[&str],
    opposite_type: &str,
    opposite_classes: &[&str],
) -> ValidationResult {
    let Some(content) = files.content(primary) else {
        return ValidationResult::invalid(primary, "Primary CWL descriptor is not present.");
    };
    if content.trim().is_empty() {
        return ValidationResult::invalid(primary, "Primary descriptor is empty.");
    }

    let doc = match parse_mapping(primary, content) {
        Ok(d) => d,
        Err(e) => {
            return ValidationResult::invalid(
                primary,
                format!("CWL file is malformed or missing, cannot extract metadata: {e}"),
            )
        }
    };

    let process = main_process(&doc);
    let class = get_str(&process, "class");
    if !class.is_some_and(|c| classes.contains(&c)) {
        let wanted = classes
            .iter()
            .map(|c| format!("'class: {c}'"))
            .collect::<Vec<_>>()
            .join(" or ");
        let mut msg = format!("A CWL {process_type} requires {wanted}.");
        if let Some(c) = class.filter(|c| opposite_classes.contains(c)) {
            msg.push_str(&format!(
                " This file contains 'class: {c}'. Did you mean to register a {opposite_type}?"
            ));
        }
        return ValidationResult::invalid(primary, msg);
    }

    let version_ok = doc
        .get("cwlVersion")
        .and_then(|v| v.as_str())
        .is_some_and(|v| v.starts_with(VERSION_PREFIX));
    if !version_ok {
        return ValidationResult::invalid(primary, "Invalid CWL version.");
    }

    ValidationResult::valid()
}
