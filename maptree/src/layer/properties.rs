use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Set of style properties (paint or layout) of a layer.
///
/// A property can be set to a value, or be explicitly unset. Unset properties are left out when
/// the layer is handed to the engine, so the engine default applies to them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(BTreeMap<String, Option<Value>>);

impl Properties {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the property value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), Some(value.into()));
    }

    /// Marks the property as unset.
    pub fn unset(&mut self, name: impl Into<String>) {
        self.0.insert(name.into(), None);
    }

    /// Value of the property, if it is set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).and_then(Option::as_ref)
    }

    /// Iterates over all properties, including the unset ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Returns true if no property was set or unset.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object with the set properties only.
    pub fn to_json(&self) -> Map<String, Value> {
        omit_unset(self.0.clone())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

/// Builds a JSON object from the entries that have a value, dropping the unset ones.
///
/// An explicit JSON `null` counts as a value and is kept.
pub fn omit_unset<K, I>(entries: I) -> Map<String, Value>
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Option<Value>)>,
{
    entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.into(), v)))
        .collect()
}
