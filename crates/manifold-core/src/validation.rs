//! Validation results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// What a file set is being validated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationKind {
    Workflow,
    Tool,
    TestParams,
}

impl ValidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Tool => "tool",
            Self::TestParams => "test-params",
        }
    }
}

impl std::str::FromStr for ValidationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "workflow" => Ok(Self::Workflow),
            "tool" => Ok(Self::Tool),
            "test-params" | "test_params" | "testparams" => Ok(Self::TestParams),
            other => Err(format!("unknown validation kind: {other}")),
        }
    }
}

/// Validity flag plus a reason for each offending path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub messages: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            messages: BTreeMap::new(),
        }
    }

    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = path.into();
        let message = message.into();
        warn!(path = %path, reason = %message, "validation failed");
        let mut messages = BTreeMap::new();
        messages.insert(path, message);
        Self {
            valid: false,
            messages,
        }
    }

    /// Valid, with an informational note (e.g. an unsupported kind).
    pub fn valid_with_note(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut messages = BTreeMap::new();
        messages.insert(path.into(), message.into());
        Self {
            valid: true,
            messages,
        }
    }

    pub fn message(&self, path: &str) -> Option<&str> {
        self.messages.get(path).map(String::as_str)
    }

    /// Keep the first failure; a valid result never replaces an invalid one.
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        if !self.valid {
            self
        } else {
            other
        }
    }
}
