//! String-keyed property maps attached to components and connections.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RfError, RfResult};

/// Ordered map from property names to lists of string values.
///
/// Multi-valued properties carry per-axis or per-level settings, so the
/// order of values under one key is significant. Iteration over keys is
/// deterministic (sorted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMap {
    entries: BTreeMap<String, Vec<String>>,
}

/// Result of merging a single entry into a [`ParameterMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The key was absent and has been inserted.
    Inserted,
    /// The key was already present with the same value list.
    Unchanged,
}

impl ParameterMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the value list under `key`, returning the previous list.
    pub fn insert<K, V>(&mut self, key: K, values: V) -> Option<Vec<String>>
    where
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        self.entries
            .insert(key.into(), values.into_iter().map(Into::into).collect())
    }

    /// Insert or replace a single-valued property.
    pub fn insert_single<K, V>(&mut self, key: K, value: V) -> Option<Vec<String>>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.entries.insert(key.into(), vec![value.into()])
    }

    /// The value list under `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// The value under `key`, but only when the list has exactly one element.
    pub fn single(&self, key: &str) -> Option<&str> {
        match self.entries.get(key).map(Vec::as_slice) {
            Some([value]) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, returning its value list.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge one entry under the compatibility rule: an absent key is
    /// inserted, an equal value list is a no-op, a differing value list is a
    /// conflict naming the key.
    pub fn merge_entry(&mut self, key: &str, values: &[String]) -> RfResult<MergeOutcome> {
        match self.entries.get(key) {
            None => {
                self.entries.insert(key.to_owned(), values.to_vec());
                Ok(MergeOutcome::Inserted)
            }
            Some(existing) if existing == values => Ok(MergeOutcome::Unchanged),
            Some(_) => Err(RfError::MergeConflict {
                key: key.to_owned(),
            }),
        }
    }

    /// Merge every entry of `other` into `self`, in key order.
    ///
    /// The first conflicting key aborts with `MergeConflict`, leaving entries
    /// merged so far in place. Callers needing atomicity snapshot first.
    pub fn merge_from(&mut self, other: &ParameterMap) -> RfResult<()> {
        for (key, values) in other.iter() {
            self.merge_entry(key, values)?;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterMap
where
    K: Into<String>,
    V: IntoIterator,
    V::Item: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V> Extend<(K, V)> for ParameterMap
where
    K: Into<String>,
    V: IntoIterator,
    V::Item: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, values) in iter {
            self.insert(key, values);
        }
    }
}

impl IntoIterator for ParameterMap {
    type Item = (String, Vec<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for ParameterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, values)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: [{}]", key, values.join(", "))?;
        }
        write!(f, "}}")
    }
}
