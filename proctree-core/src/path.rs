use serde::{Deserialize, Serialize};
use std::fmt;

pub const SEPARATOR: char = '.';

/// The `.`-joined sequence of keys from the tree root to a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DottedPath(String);

impl DottedPath {
    pub fn new(path: impl Into<String>) -> Self {
        DottedPath(path.into())
    }

    /// Joins `parent` and `key`, skipping whichever of them is empty.
    pub fn join(parent: Option<&DottedPath>, key: &str) -> Self {
        let parts = [parent.map(DottedPath::as_str).unwrap_or(""), key];
        let joined = parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(".");
        DottedPath(joined)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DottedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DottedPath {
    fn from(path: &str) -> Self {
        DottedPath::new(path)
    }
}

impl From<String> for DottedPath {
    fn from(path: String) -> Self {
        DottedPath(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_without_parent() {
        assert_eq!(DottedPath::join(None, "ping").as_str(), "ping");
    }

    #[test]
    fn test_join_with_parent() {
        let parent = DottedPath::new("user");
        assert_eq!(DottedPath::join(Some(&parent), "get").as_str(), "user.get");
    }

    #[test]
    fn test_join_skips_empty_parent() {
        let parent = DottedPath::new("");
        assert_eq!(DottedPath::join(Some(&parent), "get").as_str(), "get");
    }

    #[test]
    fn test_segments() {
        let path = DottedPath::new("a.b.c");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let path = DottedPath::new("user.list");
        assert_eq!(serde_json::to_value(&path).unwrap(), serde_json::json!("user.list"));
    }
}
