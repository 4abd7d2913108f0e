//! Notebook validation.

use manifold_core::fileset::ResolvedFileSet;
use manifold_core::validation::{ValidationKind, ValidationResult};

use super::format::Notebook;

pub(crate) fn validate(
    files: &ResolvedFileSet,
    primary: &str,
    kind: ValidationKind,
    language: Option<&str>,
) -> ValidationResult {
    match kind {
        ValidationKind::Workflow => notebook(files, primary, language),
        ValidationKind::Tool => ValidationResult::invalid(primary, "Notebooks do not support tools"),
        ValidationKind::TestParams => ValidationResult::valid(),
    }
}

fn notebook(files: &ResolvedFileSet, primary: &str, language: Option<&str>) -> ValidationResult {
    let Some(content) = files.content(primary) else {
        return ValidationResult::invalid(primary, "No notebook file is present");
    };
    let nb = match Notebook::parse(content) {
        Ok(nb) => nb,
        Err(e) => return ValidationResult::invalid(primary, format!("The notebook file is malformed: {e}")),
    };
    match language {
        Some(lang) if !lang.eq_ignore_ascii_case(nb.language()) => {
            ValidationResult::invalid(primary, format!("The notebook programming language must be '{lang}'"))
        }
        _ => ValidationResult::valid(),
    }
}
