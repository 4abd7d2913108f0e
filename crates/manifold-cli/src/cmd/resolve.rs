use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use manifold_core::fileset::ResolvedFileSet;

use crate::args::{Cli, Target};
use crate::output;

#[derive(Debug, Serialize)]
pub struct FileOut {
    pub path: String,
    pub file_type: &'static str,
    pub sha256: String,
    pub chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveOut {
    pub language: String,
    pub root: String,
    pub has_http_imports: bool,
    pub has_local_imports: bool,
    pub files: Vec<FileOut>,
}

impl ResolveOut {
    fn new(language: String, set: &ResolvedFileSet, contents: bool) -> Self {
        Self {
            language,
            root: set.primary_path().to_string(),
            has_http_imports: set.has_http_imports,
            has_local_imports: set.has_local_imports,
            files: set
                .iter()
                .map(|f| FileOut {
                    path: f.path.clone(),
                    file_type: f.file_type.as_str(),
                    sha256: f.sha256.clone(),
                    chars: f.content.chars().count(),
                    content: contents.then(|| f.content.clone()),
                })
                .collect(),
        }
    }
}

pub fn run(cli: &Cli, target: &Target, contents: bool) -> Result<ExitCode> {
    let engine = super::engine(cli)?;
    let (accessor, req) = super::open(&engine, target)?;
    let set = engine.resolve(&accessor, &req)?;
    let out = ResolveOut::new(req.language.to_string(), &set, contents);

    if output::is_json() {
        output::print_json(&out)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut w = output::stdout();
    output::heading(&mut w, &format!("{} ({}): {} files", out.root, out.language, out.files.len()))?;
    for f in &out.files {
        writeln!(w, "  {:<22} {:>8}  {}", f.file_type, f.chars, f.path)?;
    }
    if out.has_http_imports {
        writeln!(w, "  (remote imports were not fetched)")?;
    }
    Ok(ExitCode::SUCCESS)
}
