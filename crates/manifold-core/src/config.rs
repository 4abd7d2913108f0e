//! Configuration structures for manifold-core.
//!
//! Explicit, serializable configuration objects used by the host layers (CLI,
//! services) to bound resolution and to tune the preprocessor.
//!
//! The core crate itself does not read environment variables or files. The
//! caller deserializes these (the CLI reads TOML) and passes them in.

use serde::{Deserialize, Serialize};

use crate::defaults::METADATA_HINT_CLASS;
use crate::errors::{ManifoldError, ManifoldResult};

pub const DEFAULT_MAX_DEPTH: usize = 40;
pub const DEFAULT_MAX_CHARS: u64 = 512 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: u64 = 20_000;

/// Global configuration container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub limits: LimitsConfig,
    pub preprocess: PreprocessConfig,
}

/// Resource bounds applied to one top-level resolution call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum nesting of file loads, the root being depth 0.
    pub max_depth: usize,
    /// Maximum characters fetched across all loads.
    pub max_chars: u64,
    /// Maximum number of file loads.
    pub max_files: u64,
}

impl LimitsConfig {
    pub fn new(max_depth: usize, max_chars: u64, max_files: u64) -> Self {
        Self {
            max_depth,
            max_chars,
            max_files,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_chars: DEFAULT_MAX_CHARS,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

/// Preprocessor behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Give every expanded process without an `id` a random one.
    pub assign_missing_ids: bool,
    /// Class of the traceability hint written into expanded processes.
    pub metadata_hint_class: String,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            assign_missing_ids: false,
            metadata_hint_class: METADATA_HINT_CLASS.to_string(),
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &ResolverConfig) -> ManifoldResult<()> {
    if cfg.limits.max_depth == 0 {
        return Err(ManifoldError::invalid_argument(
            "max_depth must be greater than zero",
        ));
    }

    if cfg.limits.max_chars == 0 || cfg.limits.max_files == 0 {
        return Err(ManifoldError::invalid_argument(
            "max_chars and max_files must be greater than zero",
        ));
    }

    if cfg.preprocess.metadata_hint_class.trim().is_empty() {
        return Err(ManifoldError::invalid_argument(
            "metadata_hint_class must not be empty",
        ));
    }

    Ok(())
}
