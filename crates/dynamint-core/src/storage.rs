//! Ordered byte-keyed storage behind the engine.
//!
//! The provider only ever talks to [`KeyValueStore`], so the in-memory
//! backend can be swapped for a persistent one without touching any
//! operation logic. Namespaces isolate tables from their indexes:
//! `table/<name>` and `index/<table>/<index>`.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;

/// An ordered key-value store partitioned into namespaces.
///
/// Keys are compared as raw bytes-of-UTF-8, which is what makes range keys
/// sort correctly: the key codec produces strings whose lexicographic
/// order matches the typed order of the underlying values.
pub trait KeyValueStore: Send + Sync {
    /// Read one entry.
    fn get(&self, namespace: &str, key: &str) -> Option<Bytes>;
    /// Write one entry, replacing any previous value.
    fn put(&self, namespace: &str, key: &str, value: Bytes);
    /// Delete one entry; returns the previous value.
    fn delete(&self, namespace: &str, key: &str) -> Option<Bytes>;
    /// All entries with keys in `[start, end)`, in key order. `None`
    /// bounds are open.
    fn range(
        &self,
        namespace: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Vec<(String, Bytes)>;
    /// Number of entries in a namespace.
    fn len(&self, namespace: &str) -> usize;
    /// Whether a namespace holds no entries.
    fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
    /// Drop a namespace and everything in it.
    fn clear(&self, namespace: &str);
}

/// The in-memory backend: one ordered map per namespace.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: DashMap<String, Arc<RwLock<BTreeMap<String, Bytes>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, namespace: &str) -> Arc<RwLock<BTreeMap<String, Bytes>>> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Bytes> {
        let ns = self.namespaces.get(namespace)?.clone();
        let guard = ns.read();
        guard.get(key).cloned()
    }

    fn put(&self, namespace: &str, key: &str, value: Bytes) {
        let ns = self.namespace(namespace);
        ns.write().insert(key.to_string(), value);
    }

    fn delete(&self, namespace: &str, key: &str) -> Option<Bytes> {
        let ns = self.namespaces.get(namespace)?.clone();
        let mut guard = ns.write();
        guard.remove(key)
    }

    fn range(
        &self,
        namespace: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Vec<(String, Bytes)> {
        let Some(ns) = self.namespaces.get(namespace).map(|e| e.clone()) else {
            return Vec::new();
        };
        let guard = ns.read();
        let lower = start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_string()));
        let upper = end.map_or(Bound::Unbounded, |s| Bound::Excluded(s.to_string()));
        guard
            .range((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .get(namespace)
            .map_or(0, |ns| ns.read().len())
    }

    fn clear(&self, namespace: &str) {
        self.namespaces.remove(namespace);
    }
}

/// The namespace holding a table's items.
#[must_use]
pub fn table_namespace(table: &str) -> String {
    format!("table/{table}")
}

/// The namespace holding one index's entries.
#[must_use]
pub fn index_namespace(table: &str, index: &str) -> String {
    format!("index/{table}/{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_entries_per_namespace() {
        let store = MemoryStore::new();
        store.put("table/a", "k", Bytes::from_static(b"v1"));
        store.put("table/b", "k", Bytes::from_static(b"v2"));

        assert_eq!(store.get("table/a", "k"), Some(Bytes::from_static(b"v1")));
        assert_eq!(store.get("table/b", "k"), Some(Bytes::from_static(b"v2")));
        assert_eq!(store.get("table/c", "k"), None);

        assert_eq!(store.delete("table/a", "k"), Some(Bytes::from_static(b"v1")));
        assert_eq!(store.get("table/a", "k"), None);
    }

    #[test]
    fn test_should_iterate_ranges_in_key_order() {
        let store = MemoryStore::new();
        for key in ["b", "a", "d", "c"] {
            store.put("t", key, Bytes::from(key.to_string()));
        }
        let all: Vec<String> = store
            .range("t", None, None)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(all, vec!["a", "b", "c", "d"]);

        let bounded: Vec<String> = store
            .range("t", Some("b"), Some("d"))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(bounded, vec!["b", "c"]);
    }

    #[test]
    fn test_should_clear_whole_namespaces() {
        let store = MemoryStore::new();
        store.put("t", "a", Bytes::new());
        store.put("t", "b", Bytes::new());
        assert_eq!(store.len("t"), 2);
        store.clear("t");
        assert!(store.is_empty("t"));
    }
}
