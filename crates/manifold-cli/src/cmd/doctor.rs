use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use manifold_plugins::default_registry;

use crate::args::Cli;
use crate::{config, output};

#[derive(Debug, Serialize)]
pub struct Check {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorOut {
    pub ok: bool,
    pub checks: Vec<Check>,
}

pub fn run(cli: &Cli) -> Result<ExitCode> {
    let mut checks = Vec::new();

    checks.push(match config::load(cli) {
        Ok(cfg) => Check {
            name: "config".to_string(),
            ok: true,
            detail: format!(
                "max depth {}, max chars {}, max files {}",
                cfg.limits.max_depth, cfg.limits.max_chars, cfg.limits.max_files
            ),
        },
        Err(e) => Check {
            name: "config".to_string(),
            ok: false,
            detail: format!("{e:#}"),
        },
    });

    checks.push(match default_registry() {
        Ok(reg) => {
            let unusable: Vec<String> = reg
                .iter()
                .filter(|(_, r)| r.spec.validate().is_err())
                .map(|(k, _)| k.to_string())
                .collect();
            Check {
                name: "registry".to_string(),
                ok: unusable.is_empty(),
                detail: if unusable.is_empty() {
                    format!("{} languages", reg.len())
                } else {
                    format!("invalid handler specs: {}", unusable.join(", "))
                },
            }
        }
        Err(e) => Check {
            name: "registry".to_string(),
            ok: false,
            detail: format!("{e:#}"),
        },
    });

    let ok = checks.iter().all(|c| c.ok);
    if output::is_json() {
        output::print_json(&DoctorOut { ok, checks })?;
    } else {
        let mut w = output::stdout();
        for c in &checks {
            output::status(&mut w, c.ok, &format!("{}: {}", c.name, c.detail))?;
        }
    }
    Ok(super::exit_for(ok))
}
