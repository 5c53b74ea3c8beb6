//! Durable mirror of session configs
//!
//! Stores are string-keyed and hold one JSON record per session. The adapter
//! never propagates store failures: reads degrade to "absent", writes are
//! logged and dropped, and a record that can't be parsed is removed so the
//! next start is clean.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, error, info, warn};

use crate::constants::{paths, storage};

/// Key-value backend for persisted records
pub trait KeyValueStore {
    /// Raw stored value, `None` if the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store. Clones share the same map.
///
/// An optional byte quota makes writes fail once the total stored size would
/// exceed it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Rc::default(),
            quota: Some(bytes),
        }
    }

    /// Current raw value for `key`
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Write `value` directly, bypassing the quota
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.borrow_mut();
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                anyhow::bail!("quota exceeded: {needed} bytes needed, {quota} allowed");
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per record inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform config directory for this application
    pub fn default_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", storage::FILE_EXTENSION))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read stored record from {:?}", path))?;
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory {:?}", self.dir))?;
        let path = self.path_for(key);
        fs::write(&path, value)
            .with_context(|| format!("Failed to write stored record to {:?}", path))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", path)),
        }
    }
}

/// Field-by-field merge of a stored record over defaults
pub trait MergeDefaults: Sized + Clone {
    /// Build a complete value, taking each field from `fields` when it is
    /// present and valid and from `defaults` otherwise.
    fn merge_stored(defaults: &Self, fields: &mut FieldMerge<'_>) -> Self;
}

/// Cursor over one stored JSON object during a merge.
///
/// Tracks which fields had to be filled from defaults.
#[derive(Debug)]
pub struct FieldMerge<'a> {
    stored: Option<&'a Map<String, Value>>,
    prefix: String,
    filled: Vec<String>,
}

impl<'a> FieldMerge<'a> {
    pub fn new(stored: &'a Map<String, Value>) -> Self {
        Self {
            stored: Some(stored),
            prefix: String::new(),
            filled: Vec::new(),
        }
    }

    /// Field `key` if present and deserializable as `T`, else `fallback`
    pub fn take<T: DeserializeOwned + Clone>(&mut self, key: &str, fallback: &T) -> T {
        let path = self.path(key);
        let Some(raw) = self.stored.and_then(|map| map.get(key)) else {
            self.filled.push(path);
            return fallback.clone();
        };
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(value) => value,
            Err(e) => {
                debug!(field = %path, error = %e, "Stored field invalid, using default");
                self.filled.push(path);
                fallback.clone()
            }
        }
    }

    /// Like [`take`](Self::take), but accepts the field under any of `keys`.
    /// The first key is the current name; later ones are older spellings.
    pub fn take_renamed<T: DeserializeOwned + Clone>(&mut self, keys: &[&str], fallback: &T) -> T {
        let present = keys
            .iter()
            .copied()
            .find(|key| self.stored.is_some_and(|map| map.contains_key(*key)));
        let current = keys.first().copied().unwrap_or_default();
        match present {
            Some(key) => {
                let before = self.filled.len();
                let value = self.take(key, fallback);
                // Report invalid legacy fields under the current name
                if self.filled.len() > before && key != current {
                    let path = self.path(current);
                    if let Some(last) = self.filled.last_mut() {
                        *last = path;
                    }
                }
                value
            }
            None => self.take(current, fallback),
        }
    }

    /// Cursor over the nested object at `key`. A missing or non-object value
    /// yields an empty cursor, so every nested field falls back.
    pub fn nested(&self, key: &str) -> FieldMerge<'a> {
        FieldMerge {
            stored: self.stored.and_then(|map| map.get(key)).and_then(Value::as_object),
            prefix: self.path(key),
            filled: Vec::new(),
        }
    }

    /// Fold a nested cursor's report back into this one
    pub fn absorb(&mut self, child: FieldMerge<'_>) {
        self.filled.extend(child.filled);
    }

    /// Dotted paths of the fields taken from defaults
    pub fn filled(&self) -> &[String] {
        &self.filled
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }
}

/// Load/save/clear against an optional store.
///
/// Without a store (headless execution) every operation is a no-op.
#[derive(Clone, Default)]
pub struct PersistenceAdapter {
    store: Option<Rc<dyn KeyValueStore>>,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("durable", &self.is_durable())
            .finish()
    }
}

impl PersistenceAdapter {
    pub fn new(store: Option<Rc<dyn KeyValueStore>>) -> Self {
        Self { store }
    }

    pub fn is_durable(&self) -> bool {
        self.store.is_some()
    }

    /// Raw stored bytes; read failures are logged and reported as absent
    pub fn load(&self, key: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read stored record");
                None
            }
        }
    }

    /// Serialize and write `value`; failures are logged, never returned
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to serialize record");
                return;
            }
        };
        match store.set(key, &raw) {
            Ok(()) => debug!(key = %key, bytes = raw.len(), "Saved record"),
            Err(e) => warn!(key = %key, error = %e, "Failed to save record, continuing in memory"),
        }
    }

    /// Remove the record; idempotent
    pub fn clear(&self, key: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = store.remove(key) {
            warn!(key = %key, error = %e, "Failed to clear record");
        }
    }

    /// Load `key` merged over `defaults`.
    ///
    /// Absent records yield `defaults`. Unparseable records and records whose
    /// top level isn't a JSON object are logged, cleared, and replaced by
    /// `defaults`. Unknown keys in the stored object are dropped.
    pub fn load_merged<C: MergeDefaults>(&self, key: &str, defaults: &C) -> C {
        let Some(raw) = self.load(key) else {
            return defaults.clone();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => {
                let mut fields = FieldMerge::new(&map);
                let merged = C::merge_stored(defaults, &mut fields);
                if !fields.filled().is_empty() {
                    info!(key = %key, filled = ?fields.filled(), "Filled missing fields from defaults");
                }
                merged
            }
            Ok(other) => {
                error!(key = %key, found = %json_kind(&other), "Stored record is not an object, resetting to defaults");
                self.clear(key);
                defaults.clone()
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error parsing stored record, resetting to defaults");
                self.clear(key);
                defaults.clone()
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Inner {
        depth: u8,
        label: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        enabled: bool,
        inner: Inner,
    }

    impl MergeDefaults for Sample {
        fn merge_stored(defaults: &Self, fields: &mut FieldMerge<'_>) -> Self {
            let mut inner_fields = fields.nested("inner");
            let inner = Inner {
                depth: inner_fields.take("depth", &defaults.inner.depth),
                label: inner_fields.take("label", &defaults.inner.label),
            };
            fields.absorb(inner_fields);
            Self {
                enabled: fields.take("enabled", &defaults.enabled),
                inner,
            }
        }
    }

    fn defaults() -> Sample {
        Sample {
            enabled: true,
            inner: Inner {
                depth: 3,
                label: "base".to_string(),
            },
        }
    }

    fn adapter_with(store: &MemoryStore) -> PersistenceAdapter {
        PersistenceAdapter::new(Some(Rc::new(store.clone())))
    }

    #[test]
    fn test_load_absent_returns_defaults() {
        let store = MemoryStore::new();
        let adapter = adapter_with(&store);
        assert_eq!(adapter.load_merged("k", &defaults()), defaults());
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_merges_partial_nested_record() {
        let store = MemoryStore::new();
        store.insert_raw("k", r#"{"inner":{"label":"mine","extra":1},"unknown":true}"#);
        let adapter = adapter_with(&store);

        let loaded = adapter.load_merged("k", &defaults());
        assert!(loaded.enabled);
        assert_eq!(loaded.inner.depth, 3);
        assert_eq!(loaded.inner.label, "mine");
        // Valid records are not rewritten on load
        assert!(store.raw("k").is_some());
    }

    #[test]
    fn test_invalid_field_type_falls_back() {
        let store = MemoryStore::new();
        store.insert_raw("k", r#"{"enabled":"yes","inner":7}"#);
        let adapter = adapter_with(&store);
        assert_eq!(adapter.load_merged("k", &defaults()), defaults());
    }

    #[test]
    fn test_empty_object_is_complete_default() {
        let store = MemoryStore::new();
        store.insert_raw("k", "{}");
        let adapter = adapter_with(&store);
        assert_eq!(adapter.load_merged("k", &defaults()), defaults());
        assert_eq!(store.raw("k").as_deref(), Some("{}"));
    }

    #[test]
    fn test_corrupt_record_is_cleared() {
        for raw in ["{not json", "null", "[1,2]", "42", "\"text\""] {
            let store = MemoryStore::new();
            store.insert_raw("k", raw);
            let adapter = adapter_with(&store);
            assert_eq!(adapter.load_merged("k", &defaults()), defaults(), "payload {raw}");
            assert_eq!(store.raw("k"), None, "payload {raw} should be cleared");
        }
    }

    #[test]
    fn test_field_merge_reports_filled_paths() {
        let map: Map<String, Value> = serde_json::from_str(r#"{"enabled":false}"#).unwrap();
        let mut fields = FieldMerge::new(&map);
        let merged = Sample::merge_stored(&defaults(), &mut fields);
        assert!(!merged.enabled);
        assert_eq!(fields.filled(), ["inner.depth", "inner.label"]);
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let store = MemoryStore::with_quota(8);
        let adapter = adapter_with(&store);
        adapter.save("k", &defaults());
        assert!(store.is_empty());
    }

    #[test]
    fn test_headless_adapter_is_noop() {
        let adapter = PersistenceAdapter::default();
        assert!(!adapter.is_durable());
        adapter.save("k", &defaults());
        adapter.clear("k");
        assert_eq!(adapter.load("k"), None);
        assert_eq!(adapter.load_merged("k", &defaults()), defaults());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = MemoryStore::new();
        let adapter = adapter_with(&store);
        adapter.save("k", &defaults());
        adapter.clear("k");
        adapter.clear("k");
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "{\"a\":1}").unwrap();
        assert!(store.path_for("k").ends_with("k.json"));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("{\"a\":1}"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
