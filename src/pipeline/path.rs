//! Path patterns used to scope middleware.
//!
//! Patterns:
//! - `*` or `/*` match every path
//! - `/exact$` matches exactly `/exact`
//! - `/prefix` matches `/prefix` and anything below it on a segment boundary
//!
//! No regex; matching is linear in the number of patterns.

use thiserror::Error;

/// One compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Any,
    Exact(String),
    Prefix(String),
}

/// Error returned for a malformed pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path pattern '{0}': must be '*' or start with '/'")]
pub struct InvalidPattern(pub String);

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, InvalidPattern> {
        let pattern = raw.trim();
        if pattern == "*" || pattern == "/*" {
            return Ok(PathPattern::Any);
        }
        if !pattern.starts_with('/') {
            return Err(InvalidPattern(raw.to_string()));
        }
        if let Some(exact) = pattern.strip_suffix('$') {
            if exact.is_empty() {
                return Err(InvalidPattern(raw.to_string()));
            }
            return Ok(PathPattern::Exact(exact.to_string()));
        }
        let prefix = pattern.strip_suffix("/*").unwrap_or(pattern);
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            Ok(PathPattern::Any)
        } else {
            Ok(PathPattern::Prefix(prefix.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// A set of patterns with OR semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    patterns: Vec<PathPattern>,
}

impl PathFilter {
    /// Compile every pattern; fails on the first malformed one.
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> Result<Self, InvalidPattern> {
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// An empty filter matches nothing.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        let filter = PathFilter::parse(&["*"]).unwrap();
        assert!(filter.matches("/"));
        assert!(filter.matches("/a/b/c"));
        assert_eq!(PathPattern::parse("/").unwrap(), PathPattern::Any);
    }

    #[test]
    fn prefix_respects_segment_boundaries() {
        let filter = PathFilter::parse(&["/api"]).unwrap();
        assert!(filter.matches("/api"));
        assert!(filter.matches("/api/users"));
        assert!(!filter.matches("/apix"));
        assert!(!filter.matches("/"));

        let trailing = PathFilter::parse(&["/static/*"]).unwrap();
        assert!(trailing.matches("/static/app.js"));
    }

    #[test]
    fn dollar_suffix_is_exact() {
        let filter = PathFilter::parse(&["/$"]).unwrap();
        assert!(filter.matches("/"));
        assert!(!filter.matches("/index.html"));
    }

    #[test]
    fn any_pattern_in_the_set_matches() {
        let filter = PathFilter::parse(&["/a", "/b$"]).unwrap();
        assert!(filter.matches("/a/1"));
        assert!(filter.matches("/b"));
        assert!(!filter.matches("/b/1"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(PathPattern::parse("api").is_err());
        assert!(PathPattern::parse("$").is_err());
        assert!(PathFilter::parse(&["/ok", "bad"]).is_err());
    }

    #[test]
    fn empty_filter_matches_nothing() {
        let filter = PathFilter::parse::<&str>(&[]).unwrap();
        assert!(filter.is_empty());
        assert!(!filter.matches("/"));
    }
}
