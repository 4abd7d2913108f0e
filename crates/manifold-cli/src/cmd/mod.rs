use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use manifold_core::filetree::{LocalDirFileTree, StaticAccessor};
use manifold_plugins::{default_registry, Engine, LanguageKey, ResolveRequest};

use crate::args::{Cli, Command, Target};
use crate::config;

mod doctor;
mod graph;
mod index;
mod languages;
mod resolve;
mod tools;
mod validate;

/// Repository id and version reported for local checkouts.
const LOCAL_REPOSITORY: &str = "local";
const LOCAL_VERSION: &str = "working-tree";

/// Exit code of a command whose descriptor is invalid.
const INVALID: u8 = 2;

pub fn dispatch(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Resolve { target, contents } => resolve::run(&cli, target, *contents),
        Command::Graph { target, cytoscape } => graph::run(&cli, target, *cytoscape),
        Command::Tools { target } => tools::run(&cli, target),
        Command::Validate { target, kind } => validate::run(&cli, target, *kind),
        Command::Index { target, kind } => index::run(&cli, target, *kind),
        Command::Languages => languages::run(),
        Command::Doctor => doctor::run(&cli),
    }
}

pub(crate) fn engine(cli: &Cli) -> Result<Engine> {
    let cfg = config::load(cli)?;
    let registry = default_registry()?;
    Ok(Engine::new(registry, cfg)?)
}

/// Accessor over the checkout plus the request for its root descriptor.
pub(crate) fn open(engine: &Engine, target: &Target) -> Result<(StaticAccessor<LocalDirFileTree>, ResolveRequest)> {
    if !target.dir.is_dir() {
        bail!("not a directory: {}", target.dir.display());
    }
    let language = match &target.language {
        Some(key) => key.clone(),
        None => infer_language(engine, &target.root)?,
    };
    let accessor = StaticAccessor::new(LocalDirFileTree::new(&target.dir));
    let req = ResolveRequest::new(LOCAL_REPOSITORY, LOCAL_VERSION, target.root.as_str(), language);
    Ok((accessor, req))
}

fn infer_language(engine: &Engine, root: &str) -> Result<LanguageKey> {
    engine
        .registry()
        .for_path(root)
        .map(|r| r.spec.key.clone())
        .with_context(|| format!("cannot infer the language of '{root}', pass --language"))
}

pub(crate) fn exit_for(valid: bool) -> ExitCode {
    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(INVALID)
    }
}
