use std::io::Write;
use std::process::ExitCode;

use anyhow::{bail, Result};

use crate::args::{Cli, Target};
use crate::output;

pub fn run(cli: &Cli, target: &Target, cytoscape: bool) -> Result<ExitCode> {
    let engine = super::engine(cli)?;
    let (accessor, req) = super::open(&engine, target)?;
    let files = engine.resolve(&accessor, &req)?;
    let Some(graph) = engine.build_graph(&files, &req.root_path, &req.language)? else {
        bail!("language {} has no dependency graph", req.language);
    };

    if cytoscape {
        output::print_json(&graph.cytoscape())?;
        return Ok(ExitCode::SUCCESS);
    }
    if output::is_json() {
        output::print_json(&graph)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut w = output::stdout();
    output::heading(&mut w, &format!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len()))?;
    for n in &graph.nodes {
        let image = n.image.display().unwrap_or("-");
        writeln!(w, "  {:<24} {:<16} {}", n.name, n.node_type, image)?;
    }
    for e in &graph.edges {
        writeln!(w, "  {} -> {}", e.source, e.target)?;
    }
    Ok(ExitCode::SUCCESS)
}
