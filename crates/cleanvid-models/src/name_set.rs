//! Sorted set of names.
//!
//! Units (directory names under the watched root) and reported failures
//! (file base names) are both plain names. They are kept in a `BTreeSet`
//! so iteration, persistence and JSON payloads are always sorted.

use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

/// A sorted set of unit or file names.
///
/// Serializes as a JSON array of strings, which is the wire format of every
/// coordination message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameSet(BTreeSet<String>);

impl NameSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Insert a name. Returns `true` if it was not already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    /// Names in `self` that are not in `other` (`self − other`).
    pub fn difference(&self, other: &NameSet) -> NameSet {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    /// Names in either set (`self ∪ other`).
    pub fn union(&self, other: &NameSet) -> NameSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Add every name of `other` into `self`.
    pub fn merge(&mut self, other: &NameSet) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Sorted names as a vector.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Check that `name` can be used as a unit or file name.
///
/// A valid name is a single path component that fits on one line of a set
/// file. Returns the reason when it is not.
pub fn check_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty name");
    }
    if name.contains(['\n', '\r']) {
        return Err("contains a line break");
    }
    if name.contains(['/', '\0']) {
        return Err("contains a path separator or NUL");
    }
    if name == "." || name == ".." {
        return Err("refers to a directory, not a name");
    }
    Ok(())
}

impl fmt::Display for NameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name)?;
        }
        write!(f, "]")
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for NameSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for NameSet {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a NameSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<BTreeSet<String>> for NameSet {
    fn from(set: BTreeSet<String>) -> Self {
        Self(set)
    }
}
