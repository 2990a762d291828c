//! File sets
//!
//! [`FileSet`] maps relative paths to file contents. Iteration is always in
//! lexicographic path order, so any text built from a set is stable.

use crate::hash::ContentHash;
use crate::path::{ArtifactPath, PathError};
use std::collections::btree_map::{self, BTreeMap};

/// Mapping of relative path to file content
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FileSet(BTreeMap<ArtifactPath, String>);

impl FileSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from raw `(path, content)` pairs
    ///
    /// # Errors
    /// Returns the first path validation error.
    pub fn try_from_pairs<I, P, C>(pairs: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(path, content)| Ok((ArtifactPath::new(path)?, content.into())))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }

    /// Insert or overwrite a file, returning the previous content
    #[inline]
    pub fn insert(&mut self, path: ArtifactPath, content: impl Into<String>) -> Option<String> {
        self.0.insert(path, content.into())
    }

    /// Remove a file, returning its content
    #[inline]
    pub fn remove(&mut self, path: &ArtifactPath) -> Option<String> {
        self.0.remove(path)
    }

    /// Content of a file
    #[inline]
    #[must_use]
    pub fn get(&self, path: &ArtifactPath) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    /// Content of a file by raw path string
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        ArtifactPath::new(path).ok().and_then(|p| self.get(&p))
    }

    /// Whether a file exists
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &ArtifactPath) -> bool {
        self.0.contains_key(path)
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(path, content)` in path order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactPath, &str)> {
        self.0.iter().map(|(p, c)| (p, c.as_str()))
    }

    /// Iterate paths in order
    #[inline]
    pub fn paths(&self) -> impl Iterator<Item = &ArtifactPath> {
        self.0.keys()
    }

    /// Overwrite entries with every file of `other`
    ///
    /// Files absent from `other` are left untouched.
    pub fn merge(&mut self, other: &FileSet) {
        for (path, content) in other.iter() {
            self.0.insert(path.clone(), content.to_string());
        }
    }

    /// Paths whose content differs between `self` and `other`, including
    /// files present on only one side
    #[must_use]
    pub fn changed_paths(&self, other: &FileSet) -> Vec<ArtifactPath> {
        let mut changed: Vec<ArtifactPath> = self
            .iter()
            .filter(|(path, content)| other.get(path) != Some(*content))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            other
                .paths()
                .filter(|path| !self.contains(path))
                .cloned(),
        );
        changed.sort();
        changed
    }

    /// Total content size in bytes
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.0.values().map(String::len).sum()
    }

    /// Fingerprint of paths and contents
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::compute_entries(self.iter().map(|(p, c)| (p.as_str(), c)))
    }
}

impl FromIterator<(ArtifactPath, String)> for FileSet {
    fn from_iter<T: IntoIterator<Item = (ArtifactPath, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FileSet {
    type Item = (ArtifactPath, String);
    type IntoIter = btree_map::IntoIter<ArtifactPath, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<BTreeMap<ArtifactPath, String>> for FileSet {
    fn from(map: BTreeMap<ArtifactPath, String>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> FileSet {
        FileSet::try_from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn file_set_iterates_in_path_order() {
        let files = set(&[("b.txt", "2"), ("a.txt", "1"), ("a/c.txt", "3")]);
        let paths: Vec<_> = files.paths().map(ArtifactPath::as_str).collect();
        assert_eq!(paths, vec!["a.txt", "a/c.txt", "b.txt"]);
    }

    #[test]
    fn file_set_rejects_invalid_pair() {
        assert!(FileSet::try_from_pairs([("../x", "")]).is_err());
    }

    #[test]
    fn file_set_merge_overwrites_and_keeps() {
        let mut base = set(&[("a.txt", "old"), ("keep.txt", "k")]);
        base.merge(&set(&[("a.txt", "new"), ("b.txt", "b")]));
        assert_eq!(base, set(&[("a.txt", "new"), ("b.txt", "b"), ("keep.txt", "k")]));
    }

    #[test]
    fn file_set_changed_paths() {
        let before = set(&[("a.txt", "1"), ("b.txt", "2"), ("gone.txt", "x")]);
        let after = set(&[("a.txt", "1"), ("b.txt", "changed"), ("new.txt", "n")]);
        let changed: Vec<_> = after
            .changed_paths(&before)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(changed, vec!["b.txt", "gone.txt", "new.txt"]);
    }

    #[test]
    fn file_set_fingerprint_tracks_content() {
        let a = set(&[("a.txt", "1")]);
        let b = set(&[("a.txt", "2")]);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn file_set_get_str() {
        let files = set(&[("src/lib.rs", "fn f() {}")]);
        assert_eq!(files.get_str("./src/lib.rs"), Some("fn f() {}"));
        assert_eq!(files.get_str("missing"), None);
        assert_eq!(files.total_bytes(), 9);
    }
}
