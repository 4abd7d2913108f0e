//! manifold-plugins
//!
//! Language handlers for MANIFOLD and the machinery to dispatch to them:
//! - `handler`: the per-language capability set
//! - `spec`: static handler descriptions and accessor capability checks
//! - `registry`: language key to handler table, built once at startup
//! - `external`: adapter for third-party `LanguagePlugin`s
//! - `engine`: the caller entry point (resolve, graph, validate, index)
//! - `builtin`: CWL, WDL, Nextflow and Jupyter handlers (feature `builtin`)

pub mod engine;
pub mod external;
pub mod handler;
pub mod registry;
pub mod spec;

#[cfg(feature = "builtin")]
pub mod builtin;

pub use crate::engine::{Engine, GraphOutput, IndexReport, ResolveRequest};
pub use crate::handler::{LanguageHandler, LanguageKey};
pub use crate::registry::HandlerRegistry;

/// Registry holding every built-in handler.
#[cfg(feature = "builtin")]
pub fn default_registry() -> anyhow::Result<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    builtin::register_all(&mut registry)?;
    Ok(registry)
}
