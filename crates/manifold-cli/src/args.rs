use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use manifold_core::validation::ValidationKind;
use manifold_plugins::LanguageKey;

#[derive(Parser, Debug, Clone)]
#[command(name = "manifold", version, about = "MANIFOLD workflow descriptor resolver")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// TOML file with resolver limits and preprocessor settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum import nesting, overrides the config file.
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Maximum characters fetched per call, overrides the config file.
    #[arg(long, global = true)]
    pub max_chars: Option<u64>,

    /// Maximum files fetched per call, overrides the config file.
    #[arg(long, global = true)]
    pub max_files: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// A descriptor inside a checkout.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Checkout directory served as the repository.
    pub dir: PathBuf,

    /// Root descriptor path, relative to the checkout.
    pub root: String,

    /// Language key (`cwl`, `wdl`, `nextflow`, `jupyter/python`, ...).
    /// Inferred from the root's extension when omitted.
    #[arg(long, short)]
    pub language: Option<LanguageKey>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every file the root descriptor reaches.
    Resolve {
        #[command(flatten)]
        target: Target,

        /// Include file contents in JSON output.
        #[arg(long)]
        contents: bool,
    },

    /// Print the dependency graph of a workflow.
    Graph {
        #[command(flatten)]
        target: Target,

        /// Print Cytoscape elements instead of nodes and edges.
        #[arg(long)]
        cytoscape: bool,
    },

    /// Print the tools table of a workflow.
    Tools {
        #[command(flatten)]
        target: Target,
    },

    /// Validate the resolved set as a workflow, tool or test parameter set.
    Validate {
        #[command(flatten)]
        target: Target,

        /// workflow|tool|test-params
        #[arg(long, default_value = "workflow")]
        kind: ValidationKind,
    },

    /// Resolve, describe, graph and validate in one call.
    Index {
        #[command(flatten)]
        target: Target,

        /// workflow|tool|test-params
        #[arg(long, default_value = "workflow")]
        kind: ValidationKind,
    },

    /// List registered languages.
    Languages,

    /// Check the configuration and the handler registry.
    Doctor,
}
