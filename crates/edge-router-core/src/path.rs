//! Whole-path regular expression matching.

use crate::{predicate::Predicate, request::IncomingRequest};
use regex::Regex;

/// Error raised when a path pattern is not a valid regular expression.
#[derive(Debug, thiserror::Error)]
#[error("invalid path pattern '{pattern}': {source}")]
pub struct PathPatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

impl PathPatternError {
    /// The pattern that failed to compile.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Matches a request path against a regular expression.
///
/// A path matches only when the **first** match of the pattern is the entire
/// path. The pattern is not implicitly anchored, so `/abc` finds a match in
/// `/abc/def` but that match does not cover the path and is rejected.
///
/// # Examples
///
/// ```rust
/// use edge_router_core::PathMatcher;
///
/// let matcher = PathMatcher::new("/blog/.*").unwrap();
/// assert!(matcher.matches("/blog/2024/hello"));
/// assert!(!matcher.matches("/about/blog/x"));
///
/// let exact = PathMatcher::new("/abc").unwrap();
/// assert!(!exact.matches("/abc/def"));
/// ```
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: Regex,
}

impl PathMatcher {
    /// Compile a path pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PathPatternError`] when `pattern` is not a valid regular
    /// expression.
    pub fn new(pattern: &str) -> Result<Self, PathPatternError> {
        let compiled = Regex::new(pattern).map_err(|source| PathPatternError {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern: compiled })
    }

    /// The pattern source text.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Test a raw path.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern
            .find(path)
            .is_some_and(|found| found.as_str() == path)
    }
}

impl TryFrom<&str> for PathMatcher {
    type Error = PathPatternError;

    fn try_from(pattern: &str) -> Result<Self, Self::Error> {
        Self::new(pattern)
    }
}

impl Predicate for PathMatcher {
    fn evaluate(&self, request: &IncomingRequest) -> bool {
        self.matches(request.path())
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
