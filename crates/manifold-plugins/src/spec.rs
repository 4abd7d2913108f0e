//! Handler specification types for MANIFOLD.
//!
//! A `HandlerSpec` is the static, data-only description of a language
//! handler:
//! - identity (id, display name, version) and dispatch key
//! - descriptor file extensions it recognises
//! - accessor capabilities it wants (e.g. directory listings)
//!
//! Specs are used for registry metadata, the `languages` listing and for
//! checking a handler against the accessor it is about to run on.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::handler::LanguageKey;

/// Capabilities offered by the repository accessor of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessorCapabilities {
    pub listing: bool,
}

impl Default for AccessorCapabilities {
    fn default() -> Self {
        Self { listing: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerSpec {
    /// Stable handler id, e.g. "builtin.cwl".
    pub id: String,
    pub name: String,
    pub version: String,
    pub key: LanguageKey,
    /// Descriptor file extensions, lowercase, without the dot.
    pub extensions: Vec<String>,
    /// Accessor capabilities the handler wants; `true` means required.
    pub wants: BTreeMap<String, bool>,
    pub meta: BTreeMap<String, String>,
}

impl HandlerSpec {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        key: LanguageKey,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            key,
            extensions: Vec::new(),
            wants: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into().to_ascii_lowercase());
        self
    }

    pub fn want(mut self, key: impl Into<String>, value: bool) -> Self {
        self.wants.insert(key.into(), value);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn handles_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            anyhow::bail!("handler id is empty");
        }
        if !self.id.is_ascii() {
            anyhow::bail!("handler id must be ASCII");
        }
        if self.name.trim().is_empty() {
            anyhow::bail!("handler name is empty");
        }
        if self.version.trim().is_empty() {
            anyhow::bail!("handler version is empty");
        }
        if self.key.language.trim().is_empty() {
            anyhow::bail!("handler {} has an empty language key", self.id);
        }
        Ok(())
    }
}

/// Outcome of checking a spec against accessor capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEvaluation {
    pub allowed: bool,
    pub missing: Vec<String>,
}

impl SpecEvaluation {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            missing: Vec::new(),
        }
    }

    pub fn denied(missing: Vec<String>) -> Self {
        Self {
            allowed: false,
            missing,
        }
    }
}

pub fn evaluate_spec(spec: &HandlerSpec, caps: &AccessorCapabilities) -> SpecEvaluation {
    let mut missing = Vec::new();

    for (k, wants) in &spec.wants {
        if !*wants {
            continue;
        }
        let ok = match k.as_str() {
            "listing" => caps.listing,
            _ => false,
        };
        if !ok {
            missing.push(k.clone());
        }
    }

    if missing.is_empty() {
        SpecEvaluation::allowed()
    } else {
        SpecEvaluation::denied(missing)
    }
}
