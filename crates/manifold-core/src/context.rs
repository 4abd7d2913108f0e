//! Per-call resolution state.
//!
//! One `ResolutionContext` is created for each top-level resolution call and
//! threaded through every load. It owns:
//! - the chain of paths currently being expanded (cycle detection)
//! - the cumulative character and file counters
//! - the configured ceilings
//!
//! Depth is the length of the chain below the root: the primary descriptor is
//! at depth 0, its direct imports at depth 1.

use tracing::error;

use crate::config::LimitsConfig;
use crate::errors::{Bound, ManifoldError, ManifoldResult};
use crate::path::normalize;

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    limits: LimitsConfig,
    chain: Vec<String>,
    chars: u64,
    files: u64,
}

impl ResolutionContext {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            chain: Vec::new(),
            chars: 0,
            files: 0,
        }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Start expanding `path`.
    ///
    /// Fails when `path` is already on the chain or when the new depth is
    /// beyond the ceiling. On failure the chain is left untouched.
    pub fn enter(&mut self, path: &str) -> ManifoldResult<()> {
        let path = normalize(path);
        if self.chain.contains(&path) {
            let mut chain = self.chain.clone();
            chain.push(path);
            error!(chain = ?chain, "recursive import detected");
            return Err(ManifoldError::Cycle { chain });
        }

        let depth = self.chain.len();
        if depth > self.limits.max_depth {
            error!(depth, limit = self.limits.max_depth, path = %path, "depth ceiling hit");
            return Err(ManifoldError::LimitExceeded {
                bound: Bound::Depth,
                limit: self.limits.max_depth as u64,
            });
        }

        self.chain.push(path);
        Ok(())
    }

    /// Finish expanding the innermost path.
    pub fn leave(&mut self) {
        self.chain.pop();
    }

    /// Depth of the innermost path being expanded, the root being 0.
    pub fn depth(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }

    pub fn is_active(&self, path: &str) -> bool {
        let path = normalize(path);
        self.chain.iter().any(|p| *p == path)
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Count one file load attempt.
    pub fn count_file(&mut self) -> ManifoldResult<()> {
        self.files += 1;
        if self.files > self.limits.max_files {
            error!(files = self.files, limit = self.limits.max_files, "file ceiling hit");
            return Err(ManifoldError::LimitExceeded {
                bound: Bound::Files,
                limit: self.limits.max_files,
            });
        }
        Ok(())
    }

    /// Count the characters of one fetched file.
    pub fn count_chars(&mut self, content: &str) -> ManifoldResult<()> {
        self.chars += content.chars().count() as u64;
        if self.chars > self.limits.max_chars {
            error!(chars = self.chars, limit = self.limits.max_chars, "character ceiling hit");
            return Err(ManifoldError::LimitExceeded {
                bound: Bound::Characters,
                limit: self.limits.max_chars,
            });
        }
        Ok(())
    }

    pub fn files_loaded(&self) -> u64 {
        self.files
    }

    pub fn chars_loaded(&self) -> u64 {
        self.chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ctx(depth: usize, chars: u64, files: u64) -> ResolutionContext {
        ResolutionContext::new(LimitsConfig::new(depth, chars, files))
    }

    #[test]
    fn reentering_an_active_path_is_a_cycle() {
        let mut c = ctx(10, 1000, 10);
        c.enter("/a.cwl").unwrap();
        c.enter("/b.cwl").unwrap();
        let err = c.enter("a.cwl").unwrap_err();
        assert_matches!(err, ManifoldError::Cycle { ref chain } if chain == &["/a.cwl", "/b.cwl", "/a.cwl"]);
        assert_eq!(c.chain().len(), 2);
    }

    #[test]
    fn siblings_may_share_a_path() {
        let mut c = ctx(10, 1000, 10);
        c.enter("/main").unwrap();
        c.enter("/common").unwrap();
        c.leave();
        c.enter("/common").unwrap();
        assert_eq!(c.depth(), 1);
    }

    #[test]
    fn depth_ceiling_is_inclusive() {
        let mut c = ctx(2, 1000, 10);
        c.enter("/d0").unwrap();
        c.enter("/d1").unwrap();
        c.enter("/d2").unwrap();
        assert_eq!(c.depth(), 2);
        assert_matches!(
            c.enter("/d3"),
            Err(ManifoldError::LimitExceeded { bound: Bound::Depth, limit: 2 })
        );
    }

    #[test]
    fn counters_trip_just_over_the_ceiling() {
        let mut c = ctx(10, 5, 2);
        c.count_chars("héllo").unwrap();
        assert_matches!(
            c.count_chars("!"),
            Err(ManifoldError::LimitExceeded { bound: Bound::Characters, limit: 5 })
        );

        c.count_file().unwrap();
        c.count_file().unwrap();
        assert_matches!(
            c.count_file(),
            Err(ManifoldError::LimitExceeded { bound: Bound::Files, limit: 2 })
        );
    }
}
