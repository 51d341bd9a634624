//! Public models for the user-preferences module.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// A user's preference set: string keys to string values.
///
/// Serializes as a flat JSON object. Only string values deserialize, so
/// numbers, booleans, arrays, nested objects and `null` are rejected at the
/// boundary. Keys iterate in byte order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<String, String>);

impl Preferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Overlay `patch`: its keys win, keys it does not mention are kept.
    pub fn merge(&mut self, patch: Preferences) {
        self.0.extend(patch.0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key bytes plus value bytes over every entry.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.0.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, String> {
        self.0.keys()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for Preferences {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Preferences {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Preferences {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Preferences {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overlays_and_keeps_untouched_keys() {
        let mut base: Preferences = [("theme", "dark"), ("lang", "en")].into_iter().collect();
        base.merge([("lang", "fr"), ("tz", "UTC")].into_iter().collect());

        assert_eq!(base.get("theme"), Some("dark"));
        assert_eq!(base.get("lang"), Some("fr"));
        assert_eq!(base.get("tz"), Some("UTC"));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn serializes_as_flat_object_in_key_order() {
        let prefs: Preferences = [("b", "2"), ("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&prefs).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"2"}"#);
    }

    #[test]
    fn rejects_non_string_values() {
        for body in [
            r#"{"a": 1}"#,
            r#"{"a": true}"#,
            r#"{"a": null}"#,
            r#"{"a": ["x"]}"#,
            r#"{"a": {"b": "c"}}"#,
            r#"["a"]"#,
        ] {
            assert!(
                serde_json::from_str::<Preferences>(body).is_err(),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn byte_size_counts_utf8_bytes_of_keys_and_values() {
        let prefs: Preferences = [("ab", "xyz"), ("é", "")].into_iter().collect();
        assert_eq!(prefs.byte_size(), 2 + 3 + 2);
        assert_eq!(Preferences::new().byte_size(), 0);
    }

    #[test]
    fn accepts_empty_string_values() {
        let prefs: Preferences = serde_json::from_str(r#"{"a": ""}"#).unwrap();
        assert_eq!(prefs.get("a"), Some(""));
    }
}
