//! Paths through nested archives

use std::fmt;

use serde::Serialize;

/// Separator used when a path chain is rendered as a single string.
pub const SEGMENT_SEPARATOR: &str = ":";

/// Root name used for standard input.
pub const STDIN_ROOT: &str = "-";

/// Ordered names from a root input down to a nested entry.
///
/// The first segment is the root path (or `-` for standard input); every
/// further segment is the name of an entry inside the previous container.
/// Chains are never shared: [`PathChain::child`] always allocates a fresh
/// copy, so siblings cannot observe each other's segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PathChain(Vec<String>);

impl PathChain {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Extend this chain with one entry name, leaving `self` untouched.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(name.to_string());
        Self(segments)
    }

    /// The innermost name; this is what format dispatch looks at.
    pub fn last(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn root_name(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    /// Number of segments; a root has depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl fmt::Display for PathChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(SEGMENT_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_has_depth_one() {
        let path = PathChain::root("archive.tar.gz");
        assert_eq!(path.depth(), 1);
        assert_eq!(path.last(), "archive.tar.gz");
        assert_eq!(path.root_name(), "archive.tar.gz");
    }

    #[test]
    fn test_child_does_not_alias_siblings() {
        let parent = PathChain::root("outer.tar");
        let first = parent.child("a.txt");
        let second = parent.child("b.txt");

        assert_eq!(parent.segments(), ["outer.tar"]);
        assert_eq!(first.segments(), ["outer.tar", "a.txt"]);
        assert_eq!(second.segments(), ["outer.tar", "b.txt"]);
        assert_eq!(first.depth(), 2);
    }

    #[test]
    fn test_display_joins_with_colon() {
        let path = PathChain::root("l2.tar.gz").child("l1.tar").child("file");
        assert_eq!(path.to_string(), "l2.tar.gz:l1.tar:file");
        assert_eq!(path.join("/"), "l2.tar.gz/l1.tar/file");
    }

    #[test]
    fn test_serializes_as_array() {
        let path = PathChain::root("-").child("entry");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["-","entry"]"#);
    }
}
