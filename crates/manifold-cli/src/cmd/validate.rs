use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use manifold_core::validation::{ValidationKind, ValidationResult};

use crate::args::{Cli, Target};
use crate::output;

#[derive(Debug, Serialize)]
pub struct ValidateOut<'a> {
    pub kind: &'static str,
    pub root: &'a str,
    #[serde(flatten)]
    pub result: &'a ValidationResult,
}

pub fn run(cli: &Cli, target: &Target, kind: ValidationKind) -> Result<ExitCode> {
    let engine = super::engine(cli)?;
    let (accessor, req) = super::open(&engine, target)?;
    let files = engine.resolve(&accessor, &req)?;
    let result = engine.validate(&files, &req.root_path, &req.language, kind)?;

    if output::is_json() {
        output::print_json(&ValidateOut {
            kind: kind.as_str(),
            root: &req.root_path,
            result: &result,
        })?;
    } else {
        render(kind, &req.root_path, &result)?;
    }
    Ok(super::exit_for(result.valid))
}

pub(crate) fn render(kind: ValidationKind, root: &str, result: &ValidationResult) -> Result<()> {
    let mut w = output::stdout();
    output::status(&mut w, result.valid, &format!("{root} as {}", kind.as_str()))?;
    for (path, msg) in &result.messages {
        output::status(&mut w, result.valid, &format!("{path}: {msg}"))?;
    }
    Ok(())
}
