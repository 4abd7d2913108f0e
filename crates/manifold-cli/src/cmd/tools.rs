use std::io::Write;
use std::process::ExitCode;

use anyhow::{bail, Result};

use crate::args::{Cli, Target};
use crate::output;

pub fn run(cli: &Cli, target: &Target) -> Result<ExitCode> {
    let engine = super::engine(cli)?;
    let (accessor, req) = super::open(&engine, target)?;
    let files = engine.resolve(&accessor, &req)?;
    let Some(rows) = engine.tools_table(&files, &req.root_path, &req.language)? else {
        bail!("language {} has no tools table", req.language);
    };

    if output::is_json() {
        output::print_json(&rows)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut w = output::stdout();
    output::heading(&mut w, &format!("{} tools", rows.len()))?;
    for r in &rows {
        writeln!(w, "  {:<24} {:<40} {:<8} {}", r.id, r.docker, r.specifier, r.link)?;
    }
    Ok(ExitCode::SUCCESS)
}
