//! Dotted entry-point paths (`tizen.sensor.light`).
//!
//! Paths are validated against a small PEG grammar so that every segment is a plain
//! identifier that script can reach with member access.

use std::cmp::Ordering;
use std::fmt;
use std::fmt::{Display, Formatter};

use pest::Parser;
use pest_derive::Parser;

use crate::runner::ds::object_property::PropertyKey;
use crate::runner::plugin::registry::BrokerError;

#[derive(Parser)]
#[grammar = "runner/plugin/entry_point.pest"] // relative to src
struct EntryPointGrammar;

/// A validated dotted path. Ordering is segment-wise, so an ancestor always sorts
/// directly before its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    segments: Vec<String>,
}

impl EntryPoint {
    pub fn parse(path: &str) -> Result<Self, BrokerError> {
        let pairs = EntryPointGrammar::parse(Rule::entry_point, path).map_err(|e| {
            BrokerError::InvalidEntryPoint {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut segments = vec![];
        for pair in pairs {
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::segment {
                    segments.push(inner.as_str().to_string());
                }
            }
        }
        Ok(EntryPoint { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The identifier bound on the global object.
    pub fn top_level(&self) -> &str {
        &self.segments[0]
    }

    /// Segments leading to the object that holds the leaf property.
    pub fn holder_segments(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn leaf_key(&self) -> PropertyKey {
        PropertyKey::from(self.leaf())
    }

    /// `a.b` is a proper prefix of `a.b.c` but not of `a.bc` nor of itself.
    pub fn is_proper_prefix_of(&self, other: &EntryPoint) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

impl Display for EntryPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl PartialOrd for EntryPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_segment() {
        let ep = EntryPoint::parse("tizen").unwrap();
        assert_eq!(ep.depth(), 1);
        assert_eq!(ep.top_level(), "tizen");
        assert_eq!(ep.leaf(), "tizen");
        assert!(ep.holder_segments().is_empty());
    }

    #[test]
    fn test_parse_dotted() {
        let ep = EntryPoint::parse("tizen.sensor.light").unwrap();
        assert_eq!(ep.segments(), &["tizen", "sensor", "light"]);
        assert_eq!(ep.holder_segments(), &["tizen", "sensor"]);
        assert_eq!(ep.leaf(), "light");
        assert_eq!(ep.to_string(), "tizen.sensor.light");
    }

    #[test]
    fn test_parse_identifier_characters() {
        assert!(EntryPoint::parse("$_a1.b_2").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in &["", ".", "a.", ".a", "a..b", "1a", "a.b-c", "a b"] {
            match EntryPoint::parse(bad) {
                Err(BrokerError::InvalidEntryPoint { path, .. }) => assert_eq!(&path, bad),
                other => panic!("expected InvalidEntryPoint for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_proper_prefix() {
        let a = EntryPoint::parse("a").unwrap();
        let ab = EntryPoint::parse("a.b").unwrap();
        let abc = EntryPoint::parse("a.b.c").unwrap();
        let abd = EntryPoint::parse("a.bd").unwrap();
        assert!(a.is_proper_prefix_of(&ab));
        assert!(a.is_proper_prefix_of(&abc));
        assert!(ab.is_proper_prefix_of(&abc));
        assert!(!ab.is_proper_prefix_of(&abd));
        assert!(!ab.is_proper_prefix_of(&ab));
        assert!(!abc.is_proper_prefix_of(&ab));
    }

    #[test]
    fn test_ancestor_sorts_before_descendants() {
        let mut points: Vec<EntryPoint> = vec!["a.c", "a.b.c", "a-b", "a", "a.b"]
            .into_iter()
            .filter_map(|p| EntryPoint::parse(p).ok())
            .collect();
        points.sort();
        let names: Vec<String> = points.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["a", "a.b", "a.b.c", "a.c"]);
    }
}
