//! Route templates and the segment-by-segment matcher.
//!
//! A template such as `/users/:name/articles` is split on `/`. Every segment
//! is either a literal, which must equal the request segment exactly, or a
//! capture (`:name`), which binds whatever the request has in that slot.
//!
//! There is no wildcard, no optional segment and no backtracking: a pattern
//! and a path match only if they have the same number of segments, and the
//! walk stops at the first literal that differs.

use std::fmt;

use crate::params::Params;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw
            .split('/')
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(s.to_owned()),
            })
            .collect();
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches `path` against the template.
    ///
    /// Returns the bound parameters on success. Empty segments, such as the
    /// one produced by a trailing slash, are compared like any other.
    ///
    /// ```
    /// use waypost::PathPattern;
    ///
    /// let pattern = PathPattern::new("/users/:name");
    /// let params = pattern.matches("/users/ann").unwrap();
    /// assert_eq!(params.get("name"), Some("ann"));
    ///
    /// assert!(pattern.matches("/users/ann/").is_none());
    /// ```
    pub fn matches(&self, path: &str) -> Option<Params> {
        if path.split('/').count() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (segment, actual) in self.segments.iter().zip(path.split('/')) {
            match segment {
                Segment::Param(name) => params.set(name.as_str(), actual),
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only() {
        let p = PathPattern::new("/users");
        assert_eq!(p.matches("/users"), Some(Params::new()));
        assert!(p.matches("/user").is_none());
    }

    #[test]
    fn single_param() {
        let p = PathPattern::new("/users/:name");
        let params = p.matches("/users/yang-zzhong").unwrap();
        assert_eq!(params.get("name"), Some("yang-zzhong"));
    }

    #[test]
    fn param_between_literals() {
        let p = PathPattern::new("/users/:name/articles");
        let params = p.matches("/users/yang/articles").unwrap();
        assert_eq!(params.get("name"), Some("yang"));
        assert!(p.matches("/users/yang/comments").is_none());
    }

    #[test]
    fn every_segment_a_param() {
        let p = PathPattern::new("/:name/:article-name");
        let params = p.matches("/yang/Me+And+My+Broken+Heart").unwrap();
        assert_eq!(
            params.iter().collect::<Vec<_>>(),
            vec![("name", "yang"), ("article-name", "Me+And+My+Broken+Heart")]
        );
    }

    #[test]
    fn segment_count_mismatch_never_matches() {
        let p = PathPattern::new("/a/:x");
        assert!(p.matches("/a").is_none());
        assert!(p.matches("/a/1/2").is_none());
        assert!(p.matches("/a/1/").is_none());
    }

    #[test]
    fn trailing_slash_is_a_segment() {
        let p = PathPattern::new("/a/");
        assert!(p.matches("/a/").is_some());
        assert!(p.matches("/a").is_none());

        // A capture happily binds the empty segment.
        let p = PathPattern::new("/a/:x");
        assert_eq!(p.matches("/a/").unwrap().get("x"), Some(""));
    }

    #[test]
    fn values_are_not_decoded() {
        let p = PathPattern::new("/files/:name");
        let params = p.matches("/files/a%20b").unwrap();
        assert_eq!(params.get("name"), Some("a%20b"));
    }
}
