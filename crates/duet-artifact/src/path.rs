//! Artifact paths
//!
//! Provides [`ArtifactPath`], a validated path relative to the sandbox root.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Relative path of a generated file
///
/// Always `/` separated, never absolute, and free of `.`/`..` segments, so
/// it can be joined onto any sandbox root without escaping it.
///
/// # Examples
/// - `main.py`
/// - `src/lib.rs`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactPath(String);

impl ArtifactPath {
    /// Validate and normalize a raw path
    ///
    /// Backslashes become `/` and leading `./` prefixes are dropped.
    ///
    /// # Errors
    /// Returns error if the path is empty, absolute, or contains
    /// empty, `.` or `..` segments.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PathError> {
        let normalized = raw.as_ref().trim().replace('\\', "/");
        let mut rest = normalized.as_str();
        while let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        }

        if rest.is_empty() {
            return Err(PathError::Empty);
        }
        if rest.starts_with('/') || has_drive_prefix(rest) {
            return Err(PathError::Absolute(rest.to_string()));
        }

        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(rest.to_string()));
            }
            if segment == "." || segment == ".." || segment.contains('\0') {
                return Err(PathError::InvalidSegment(segment.to_string()));
            }
        }

        Ok(Self(rest.to_string()))
    }

    /// Path as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments from root to leaf
    #[inline]
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Final segment
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Parent directory, if the path is nested
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// Whether any segment is a dotfile
    #[inline]
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.segments().any(|s| s.starts_with('.'))
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl Display for ArtifactPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ArtifactPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ArtifactPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ArtifactPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArtifactPath> for String {
    fn from(path: ArtifactPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ArtifactPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors related to artifact paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing left after normalization
    #[error("path is empty")]
    Empty,

    /// Path escapes the sandbox root
    #[error("path is absolute: {0}")]
    Absolute(String),

    /// `a//b` style path
    #[error("path contains empty segment: {0}")]
    EmptySegment(String),

    /// `.`, `..` or NUL in a segment
    #[error("invalid segment: {0}")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_plain_file() {
        let path = ArtifactPath::new("main.py").unwrap();
        assert_eq!(path.as_str(), "main.py");
        assert_eq!(path.file_name(), "main.py");
        assert!(path.parent().is_none());
    }

    #[test]
    fn path_nested() {
        let path = ArtifactPath::new("src/utils/io.rs").unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["src", "utils", "io.rs"]);
        assert_eq!(path.parent(), Some("src/utils"));
        assert_eq!(path.file_name(), "io.rs");
    }

    #[test]
    fn path_normalizes_separators_and_dot_prefix() {
        let path = ArtifactPath::new(" ./src\\main.rs ").unwrap();
        assert_eq!(path.as_str(), "src/main.rs");
    }

    #[test]
    fn path_rejects_empty() {
        assert_eq!(ArtifactPath::new("   "), Err(PathError::Empty));
        assert_eq!(ArtifactPath::new("./"), Err(PathError::Empty));
    }

    #[test]
    fn path_rejects_absolute() {
        assert!(matches!(ArtifactPath::new("/etc/passwd"), Err(PathError::Absolute(_))));
        assert!(matches!(ArtifactPath::new("C:/x.txt"), Err(PathError::Absolute(_))));
    }

    #[test]
    fn path_rejects_traversal() {
        assert!(matches!(ArtifactPath::new("../x"), Err(PathError::InvalidSegment(_))));
        assert!(matches!(ArtifactPath::new("a/./b"), Err(PathError::InvalidSegment(_))));
        assert!(matches!(ArtifactPath::new("a//b"), Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn path_hidden() {
        assert!(ArtifactPath::new(".env").unwrap().is_hidden());
        assert!(ArtifactPath::new("a/.git/config").unwrap().is_hidden());
        assert!(!ArtifactPath::new("a/b.txt").unwrap().is_hidden());
    }

    #[test]
    fn path_ordering_is_lexicographic() {
        let mut paths = vec![
            ArtifactPath::new("b.txt").unwrap(),
            ArtifactPath::new("a/z.txt").unwrap(),
            ArtifactPath::new("a.txt").unwrap(),
        ];
        paths.sort();
        let strs: Vec<_> = paths.iter().map(ArtifactPath::as_str).collect();
        assert_eq!(strs, vec!["a.txt", "a/z.txt", "b.txt"]);
    }
}
