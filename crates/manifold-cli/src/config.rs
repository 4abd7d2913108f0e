use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use manifold_core::config::{validate_config, ResolverConfig};

use crate::args::Cli;

/// Resolver configuration from the optional TOML file, then the flags.
pub fn load(cli: &Cli) -> Result<ResolverConfig> {
    let mut cfg = match &cli.config {
        Some(path) => from_file(path)?,
        None => ResolverConfig::default(),
    };

    if let Some(d) = cli.max_depth {
        cfg.limits.max_depth = d;
    }
    if let Some(c) = cli.max_chars {
        cfg.limits.max_chars = c;
    }
    if let Some(f) = cli.max_files {
        cfg.limits.max_files = f;
    }

    validate_config(&cfg).context("invalid resolver configuration")?;
    Ok(cfg)
}

fn from_file(path: &Path) -> Result<ResolverConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("cannot read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
}
