// SPDX-License-Identifier: MIT

//! Action descriptions: the immutable, order-independent identity key an
//! action is admitted and deduplicated by.

use crate::error::SchedulerError;
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};

/// Reserved key selecting the plugin that builds the concrete [`crate::action::Action`].
pub const NAME_KEY: &str = "name";

/// Canonical, immutable key/value description of an action.
///
/// Construction order is preserved for iteration and for the wire format,
/// but [`ActionDescription::identity_hash`] and [`PartialEq`] are defined
/// over the full key/value *set*, independent of order: two descriptions
/// with the same pairs in a different order are the same action.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ActionDescription {
    pairs: IndexMap<String, String>,
}

impl ActionDescription {
    /// Build a description from an ordered list of key/value pairs.
    ///
    /// Later duplicate keys overwrite earlier ones, matching the last-write-
    /// wins behavior of building an ordinary map from a pair list.
    pub fn new(pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let mut map = IndexMap::new();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { pairs: map }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// Iterate the pairs in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The `name` field, which selects the plugin via the action factory.
    ///
    /// Fails fast with [`SchedulerError::BadParameter`] if absent.
    pub fn name(&self) -> Result<&str, SchedulerError> {
        self.get(NAME_KEY)
            .ok_or_else(|| SchedulerError::BadParameter("description is missing `name`".into()))
    }

    /// Every key/value pair other than `name`, preserved as an open-ended
    /// extension point rather than a fixed schema of optional fields.
    pub fn extras(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| *k != NAME_KEY)
    }

    /// Order-independent 64-bit identity hash, used for deduplication.
    pub fn identity_hash(&self) -> u64 {
        // Sort by key so the hash does not depend on construction order,
        // then fold each pair into the hasher independently of position.
        let mut entries: Vec<(&str, &str)> = self.iter().collect();
        entries.sort_unstable_by_key(|(k, _)| *k);

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        entries.len().hash(&mut hasher);
        for (k, v) in entries {
            k.hash(&mut hasher);
            v.hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl PartialEq for ActionDescription {
    fn eq(&self, other: &Self) -> bool {
        self.pairs.len() == other.pairs.len()
            && self.pairs.iter().all(|(k, v)| other.pairs.get(k).is_some_and(|ov| ov == v))
    }
}

impl Eq for ActionDescription {}

// Not a `builder!`-generated type: that macro's field groups assume a
// fixed, known set of fields, while a description accumulates an arbitrary
// number of key/value pairs. Hand-rolled in the same fluent,
// consuming-`self` style the macro produces.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct ActionDescriptionBuilder {
    pairs: IndexMap<String, String>,
}

#[cfg(any(test, feature = "test-support"))]
impl ActionDescriptionBuilder {
    /// Set the plugin `name`.
    pub fn name(self, name: impl Into<String>) -> Self {
        self.put(NAME_KEY, name)
    }

    /// Set an arbitrary key/value pair.
    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> ActionDescription {
        ActionDescription { pairs: self.pairs }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ActionDescription {
    pub fn builder() -> ActionDescriptionBuilder {
        ActionDescriptionBuilder::default()
    }
}

#[cfg(test)]
#[path = "description_tests.rs"]
mod tests;
