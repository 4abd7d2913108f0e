use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;

use manifold_core::validation::ValidationKind;

use crate::args::{Cli, Target};
use crate::output;

pub fn run(cli: &Cli, target: &Target, kind: ValidationKind) -> Result<ExitCode> {
    let engine = super::engine(cli)?;
    let (accessor, req) = super::open(&engine, target)?;
    let report = engine.index(&accessor, &req, kind)?;

    if output::is_json() {
        output::print_json(&report)?;
        return Ok(super::exit_for(report.validation.valid));
    }

    let mut w = output::stdout();
    output::heading(&mut w, &format!("{} ({})", report.root_path, report.language))?;
    writeln!(w, "  files:    {}", report.files.len())?;
    if let Some(d) = &report.metadata.description {
        writeln!(w, "  about:    {}", d.lines().next().unwrap_or_default())?;
    }
    for a in &report.metadata.authors {
        let name = a.name.as_deref().unwrap_or("?");
        match &a.email {
            Some(e) => writeln!(w, "  author:   {name} <{e}>")?,
            None => writeln!(w, "  author:   {name}")?,
        }
    }
    if let Some(v) = &report.metadata.language_version {
        writeln!(w, "  version:  {v}")?;
    }
    if let Some(g) = &report.graph {
        writeln!(w, "  graph:    {} nodes, {} edges", g.nodes.len(), g.edges.len())?;
    }
    if let Some(t) = &report.tools {
        writeln!(w, "  tools:    {}", t.len())?;
    }
    writeln!(w, "  cache:    {} reads, {} hits", report.cache.reads, report.cache.read_hits)?;
    super::validate::render(kind, &report.root_path, &report.validation)?;
    Ok(super::exit_for(report.validation.valid))
}
