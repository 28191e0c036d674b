//! Immutable key/value payloads passed into and out of workers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An immutable string-to-string payload.
///
/// Keys are kept ordered so payloads compare and serialize deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkData {
    entries: BTreeMap<String, String>,
}

impl WorkData {
    /// Creates an empty payload.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts building a payload.
    #[must_use]
    pub fn builder() -> WorkDataBuilder {
        WorkDataBuilder::default()
    }

    /// Creates a payload holding one entry.
    #[must_use]
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::builder().put(key, value).build()
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Builder for [`WorkData`].
#[derive(Debug, Default)]
pub struct WorkDataBuilder {
    entries: BTreeMap<String, String>,
}

impl WorkDataBuilder {
    /// Adds an entry, replacing any previous value for the key.
    #[must_use]
    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Copies every entry from another payload.
    #[must_use]
    pub fn put_all(mut self, other: &WorkData) -> Self {
        for (k, v) in other.iter() {
            self.entries.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Finishes the payload.
    #[must_use]
    pub fn build(self) -> WorkData {
        WorkData {
            entries: self.entries,
        }
    }
}
