use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use manifold_plugins::default_registry;
use manifold_plugins::registry::HandlerSummary;

use crate::output;

#[derive(Debug, Serialize)]
pub struct LanguagesOut {
    pub languages: Vec<HandlerSummary>,
}

pub fn run() -> Result<ExitCode> {
    let languages = default_registry()?.list();

    if output::is_json() {
        output::print_json(&LanguagesOut { languages })?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut w = output::stdout();
    output::heading(&mut w, "Registered languages")?;
    for l in &languages {
        let ext = if l.extensions.is_empty() {
            "-".to_string()
        } else {
            l.extensions.join(", ")
        };
        writeln!(w, "  {:<16} {:<36} {:<8} {}", l.key, l.name, l.version, ext)?;
    }
    Ok(ExitCode::SUCCESS)
}
