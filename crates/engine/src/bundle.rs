//! Option bundles: the ordered key/value lists handed to a stage at start,
//! and returned, unchanged in meaning, to its stop hook.
//!
//! A bundle entry is either a plain JSON value (user overrides, resolved
//! plugin context) or a `TableHandle` (the framework-injected `tid` /
//! `next_tid` / `common_pipeline_tid` / `pipeline_tid` keys) — Erlang option
//! lists happily carry opaque terms like ETS table ids alongside ordinary
//! data, and `BundleValue` mirrors that rather than forcing table
//! references through JSON.

use serde_json::Value;

use crate::table::TableHandle;

#[derive(Clone, Debug)]
pub enum BundleValue {
    Json(Value),
    Table(TableHandle),
}

impl BundleValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            BundleValue::Json(v) => Some(v),
            BundleValue::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableHandle> {
        match self {
            BundleValue::Table(t) => Some(t),
            BundleValue::Json(_) => None,
        }
    }
}

impl From<Value> for BundleValue {
    fn from(v: Value) -> Self {
        BundleValue::Json(v)
    }
}

impl From<TableHandle> for BundleValue {
    fn from(t: TableHandle) -> Self {
        BundleValue::Table(t)
    }
}

/// An ordered list of key/value options, Elixir-keyword-list style: keys may
/// repeat, and a lookup returns the *first* occurrence. `concat_first_wins`
/// realizes the setup protocol's "framework prefix concatenated first, user
/// overrides appended after" rule, so the framework's well-known keys
/// (`spider`, `tid`, `next_tid`, `common_pipeline_tid`, `pipeline_tid`) win
/// over same-named user overrides, per the reserved-keys note in the design
/// notes.
#[derive(Clone, Debug, Default)]
pub struct OptionBundle(Vec<(String, BundleValue)>);

impl OptionBundle {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<BundleValue>) {
        self.0.push((key.into(), value.into()));
    }

    /// First-occurrence lookup, matching keyword-list semantics.
    pub fn get_raw(&self, key: &str) -> Option<&BundleValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_raw(key).and_then(BundleValue::as_json)
    }

    pub fn get_table(&self, key: &str) -> Option<&TableHandle> {
        self.get_raw(key).and_then(BundleValue::as_table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, BundleValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenate `prefix` ahead of `self`. Because lookups return the
    /// first occurrence, any key present in both keeps the prefix's value.
    pub fn concat_first_wins(prefix: OptionBundle, overrides: OptionBundle) -> OptionBundle {
        let mut out = prefix.0;
        out.extend(overrides.0);
        OptionBundle(out)
    }

    /// Insert or replace a key, used by plugin resolution to inject a
    /// single well-known key (e.g. `context`) after the bundle is otherwise
    /// assembled.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<BundleValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Flatten the JSON-valued entries into a map, dropping table handles
    /// (which have no JSON representation). Used for debugging/inspection
    /// and by tests.
    pub fn to_json_map(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.0 {
            if let BundleValue::Json(v) = v {
                map.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        map
    }

    /// Structural equality over the JSON-representable view of a bundle.
    /// Used to check the invariant that a stage's stop bundle equals its
    /// start bundle — `TableHandle`s compare by identity of the role they
    /// carry plus their current contents being irrelevant to the check, so
    /// this compares keys and JSON values; table-valued keys are compared by
    /// role.
    pub fn semantically_eq(&self, other: &OptionBundle) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        self.0.iter().zip(other.0.iter()).all(|((k1, v1), (k2, v2))| {
            if k1 != k2 {
                return false;
            }
            match (v1, v2) {
                (BundleValue::Json(a), BundleValue::Json(b)) => a == b,
                (BundleValue::Table(a), BundleValue::Table(b)) => a.role() == b.role(),
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_occurrence_wins_on_lookup() {
        let mut bundle = OptionBundle::new();
        bundle.push("spider", json!("s1"));
        bundle.push("spider", json!("s2-should-be-shadowed"));
        assert_eq!(bundle.get("spider"), Some(&json!("s1")));
    }

    #[test]
    fn concat_prefers_prefix_for_duplicate_keys() {
        let mut prefix = OptionBundle::new();
        prefix.push("tid", json!("framework-tid"));

        let mut overrides = OptionBundle::new();
        overrides.push("tid", json!("user-tid"));
        overrides.push("custom", json!(true));

        let merged = OptionBundle::concat_first_wins(prefix, overrides);
        assert_eq!(merged.get("tid"), Some(&json!("framework-tid")));
        assert_eq!(merged.get("custom"), Some(&json!(true)));
    }

    #[test]
    fn table_values_round_trip() {
        use crate::ids::TableRole;

        let mut bundle = OptionBundle::new();
        bundle.push("tid", TableHandle::new(TableRole::Downloader));
        assert!(bundle.get_table("tid").is_some());
        assert!(bundle.get("tid").is_none());
    }
}
