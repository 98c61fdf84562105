//! `SharedTable` — a concurrent key/value map per pipeline stage or
//! middleware scope, and `TableHandle`, the opaque reference to one.
//!
//! Realizes the "sharded lock-free map" note from the design notes using
//! `dashmap`, which the rest of this workspace (`crates/daemon`) already
//! depends on for the same purpose.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::ids::TableRole;

/// A concurrent, set-valued key/value table. Multiple stages may read and
/// write it at once; the Engine itself never inspects the contents, only
/// creates, publishes, dumps and loads it.
#[derive(Debug, Default)]
pub struct SharedTable {
    role: Option<TableRole>,
    entries: DashMap<String, Value>,
}

impl SharedTable {
    pub fn new(role: TableRole) -> Self {
        Self {
            role: Some(role),
            entries: DashMap::new(),
        }
    }

    pub fn role(&self) -> Option<TableRole> {
        self.role
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all entries, used by the dump path. Not atomic with
    /// concurrent writers — callers must ensure quiescence (the Engine only
    /// calls this while `suspend`ed).
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Replace the table's contents with the given entries, used by the
    /// load path.
    pub fn restore(&self, entries: Vec<(String, Value)>) {
        self.entries.clear();
        for (k, v) in entries {
            self.entries.insert(k, v);
        }
    }
}

/// An opaque, cheaply-clonable reference to a `SharedTable`. Does not own
/// the table's lifetime: tables live as long as any handle to them is held,
/// which in practice is the lifetime of the owning Engine's supervision
/// tree.
#[derive(Clone, Debug)]
pub struct TableHandle(Arc<SharedTable>);

impl TableHandle {
    pub fn new(role: TableRole) -> Self {
        Self(Arc::new(SharedTable::new(role)))
    }

    pub fn from_table(table: SharedTable) -> Self {
        Self(Arc::new(table))
    }

    pub fn role(&self) -> Option<TableRole> {
        self.0.role()
    }

    pub fn table(&self) -> &SharedTable {
        &self.0
    }
}

impl std::ops::Deref for TableHandle {
    type Target = SharedTable;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
