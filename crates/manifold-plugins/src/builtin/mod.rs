//! Built-in language handlers.
//!
//! Each handler module exposes `register(registry)`; `register_all` installs
//! every built-in in a fixed order.

#![cfg(feature = "builtin")]

pub mod cwl;
pub mod nextflow;
pub mod notebook;
pub mod wdl;

mod text;

use anyhow::Result;

use manifold_core::document::parse_document;
use manifold_core::fileset::{FileType, ResolvedFileSet};
use manifold_core::validation::ValidationResult;

use crate::registry::HandlerRegistry;

pub fn register_all(registry: &mut HandlerRegistry) -> Result<()> {
    cwl::register(registry)?;
    wdl::register(registry)?;
    nextflow::register(registry)?;
    notebook::register(registry)?;
    Ok(())
}

/// Every test parameter file of the set must parse as JSON or YAML.
pub(crate) fn check_test_parameter_files(files: &ResolvedFileSet) -> ValidationResult {
    files
        .files_of_type(FileType::TestParameters)
        .fold(ValidationResult::valid(), |acc, f| {
            let checked = match parse_document(&f.path, &f.content) {
                Ok(_) => ValidationResult::valid(),
                Err(e) => ValidationResult::invalid(&f.path, e.to_string()),
            };
            merge_messages(acc, checked)
        })
}

/// Union of two results: invalid when either is, messages of both kept.
pub(crate) fn merge_messages(mut a: ValidationResult, b: ValidationResult) -> ValidationResult {
    a.valid &= b.valid;
    for (k, v) in b.messages {
        a.messages.entry(k).or_insert(v);
    }
    a
}
