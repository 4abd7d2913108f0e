//! Error types for manifold-core.
//!
//! Every fatal outcome of a resolution call is one `ManifoldError` variant.
//! Not-found imports are recovered inside the resolvers and only surface
//! here when the primary descriptor itself is missing.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Result alias used across the workspace.
pub type ManifoldResult<T> = std::result::Result<T, ManifoldError>;

/// Resource bound that aborted a resolution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Depth,
    Characters,
    Files,
}

impl Bound {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::Characters => "characters",
            Self::Files => "files",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Depth => "maximum file depth",
            Self::Characters => "maximum character count",
            Self::Files => "maximum file count",
        }
    }
}

#[derive(Error, Debug)]
pub enum ManifoldError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("malformed document '{path}': {message}")]
    Malformed { path: String, message: String },

    #[error("recursive import detected: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("descriptor might be recursive: {} ({}) exceeded", .bound.describe(), .limit)]
    LimitExceeded { bound: Bound, limit: u64 },

    #[error("unsupported language: {key}")]
    UnsupportedLanguage { key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error("io error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ManifoldError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn unsupported(key: impl Into<String>) -> Self {
        Self::UnsupportedLanguage { key: key.into() }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Malformed { .. } => "MALFORMED_DOCUMENT",
            Self::Cycle { .. } => "CYCLE_DETECTED",
            Self::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            Self::UnsupportedLanguage { .. } => "UNSUPPORTED_LANGUAGE",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Plugin(_) => "PLUGIN_ERROR",
            Self::Io { .. } => "IO_ERROR",
        }
    }

    /// True for outcomes a resolver may swallow (a missing import target).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for outcomes that abort the whole call.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Offending path, when the error is tied to one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NotFound { path } | Self::Malformed { path, .. } | Self::Io { path, .. } => {
                Some(path.as_str())
            }
            Self::Cycle { chain } => chain.last().map(|s| s.as_str()),
            _ => None,
        }
    }

    /// Structured rendering for `--json` output and API payloads.
    pub fn to_json(&self) -> serde_json::Value {
        let mut v = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(p) = self.path() {
            v["path"] = json!(p);
        }
        match self {
            Self::Cycle { chain } => v["chain"] = json!(chain),
            Self::LimitExceeded { bound, limit } => {
                v["bound"] = json!(bound.as_str());
                v["limit"] = json!(limit);
            }
            _ => {}
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_message_names_the_bound() {
        let e = ManifoldError::LimitExceeded {
            bound: Bound::Files,
            limit: 3,
        };
        assert_eq!(
            e.to_string(),
            "descriptor might be recursive: maximum file count (3) exceeded"
        );
        assert_eq!(e.code(), "LIMIT_EXCEEDED");
        assert_eq!(e.to_json()["bound"], "files");
    }

    #[test]
    fn cycle_reports_chain() {
        let e = ManifoldError::Cycle {
            chain: vec!["/a.cwl".into(), "/b.cwl".into(), "/a.cwl".into()],
        };
        assert_eq!(e.to_string(), "recursive import detected: /a.cwl -> /b.cwl -> /a.cwl");
        assert_eq!(e.path(), Some("/a.cwl"));
        assert!(!e.is_recoverable());
    }

    #[test]
    fn only_not_found_is_recoverable() {
        assert!(ManifoldError::not_found("/x").is_recoverable());
        assert!(!ManifoldError::malformed("/x", "bad").is_recoverable());
        assert!(!ManifoldError::unsupported("cobol").is_recoverable());
        assert!(ManifoldError::invalid_argument("x").is_fatal());
    }
}
