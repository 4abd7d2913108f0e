//! Nextflow set validation.
//!
//! Workflows only need a parseable config with a manifest. Tools do not
//! exist in Nextflow and test parameter files are not checked; both are
//! valid, with a note.

use manifold_core::fileset::{FileType, ResolvedFileSet};
use manifold_core::validation::{ValidationKind, ValidationResult};

use super::config;
use crate::builtin::merge_messages;

pub(crate) fn validate(files: &ResolvedFileSet, primary: &str, kind: ValidationKind) -> ValidationResult {
    match kind {
        ValidationKind::Workflow => workflow(files, primary),
        ValidationKind::Tool => ValidationResult::valid_with_note(primary, "Nextflow does not support tools."),
        ValidationKind::TestParams => files
            .files_of_type(FileType::TestParameters)
            .fold(ValidationResult::valid(), |acc, f| {
                merge_messages(
                    acc,
                    ValidationResult::valid_with_note(&f.path, "Nextflow does not support test parameter files."),
                )
            }),
    }
}

fn workflow(files: &ResolvedFileSet, primary: &str) -> ValidationResult {
    let Some(content) = files.content(primary) else {
        return ValidationResult::invalid(primary, format!("Descriptor file '{primary}' not found."));
    };
    match config::effective(files, primary) {
        Ok(c) if c.has_manifest() => ValidationResult::valid(),
        Ok(_) if content.contains("manifest") => ValidationResult::valid(),
        Ok(_) => ValidationResult::invalid(
            primary,
            format!("Descriptor file '{primary}' is missing the manifest section."),
        ),
        Err(e) => ValidationResult::invalid(
            primary,
            format!("Nextflow config file is malformed or missing, cannot extract metadata: {e}"),
        ),
    }
}
