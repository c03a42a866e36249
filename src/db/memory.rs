// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used for tests and offline runs. Semantics follow Firestore where the
//! payment layer depends on them: `merge` upserts, `update` requires the
//! document to exist, listeners get the full collection on every change.
//! Paths can be marked as denied to simulate security-rule failures.

use crate::db::{
    CollectionPath, DocPath, Document, DocumentStore, ListenerHandle, SnapshotCallback, StoreError,
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

struct Listener {
    collection: String,
    on_change: SnapshotCallback,
}

#[derive(Default)]
struct Inner {
    /// Documents keyed by full path
    docs: DashMap<String, Map<String, Value>>,
    listeners: DashMap<u64, Listener>,
    next_listener_id: AtomicU64,
    /// Path prefixes for which every operation fails with permission denied
    denied: DashSet<String>,
    writes: AtomicUsize,
}

/// In-memory [`DocumentStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without counting it as a write or notifying listeners.
    pub fn seed(&self, path: &str, data: Value) -> Result<(), StoreError> {
        let path = DocPath::parse(path)?;
        self.inner
            .docs
            .insert(path.to_string(), into_object(data, &path)?);
        Ok(())
    }

    /// Read a document synchronously (test inspection).
    pub fn snapshot(&self, path: &str) -> Option<Value> {
        self.inner
            .docs
            .get(path.trim_matches('/'))
            .map(|doc| Value::Object(doc.clone()))
    }

    /// Make every operation under `prefix` fail with permission denied.
    pub fn deny(&self, prefix: &str) {
        self.inner.denied.insert(prefix.trim_matches('/').to_string());
    }

    pub fn allow(&self, prefix: &str) {
        self.inner.denied.remove(prefix.trim_matches('/'));
    }

    /// Number of successful writes (merge/update/delete) so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Delete a document, notifying listeners.
    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        let path = DocPath::parse(path)?;
        self.check_allowed(&path.to_string())?;
        if self.inner.docs.remove(&path.to_string()).is_some() {
            self.inner.writes.fetch_add(1, Ordering::SeqCst);
            self.notify(&path.collection());
        }
        Ok(())
    }

    fn check_allowed(&self, path: &str) -> Result<(), StoreError> {
        let denied = self
            .inner
            .denied
            .iter()
            .any(|prefix| path == prefix.as_str() || path.starts_with(&format!("{}/", *prefix)));
        if denied {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn list_sync(&self, collection: &CollectionPath) -> Vec<Document> {
        let depth = collection.segments().len() + 1;
        let prefix = format!("{}/", collection);
        let mut docs: Vec<Document> = self
            .inner
            .docs
            .iter()
            .filter(|entry| {
                entry.key().starts_with(&prefix) && entry.key().split('/').count() == depth
            })
            .map(|entry| Document {
                id: entry.key()[prefix.len()..].to_string(),
                data: Value::Object(entry.value().clone()),
            })
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    fn notify(&self, collection: &CollectionPath) {
        let key = collection.to_string();
        // Collect callbacks first so no map guard is held while user code runs
        let callbacks: Vec<SnapshotCallback> = self
            .inner
            .listeners
            .iter()
            .filter(|l| l.collection == key)
            .map(|l| l.on_change.clone())
            .collect();
        if callbacks.is_empty() {
            return;
        }
        let docs = self.list_sync(collection);
        for callback in callbacks {
            callback(docs.clone());
        }
    }

    fn write(
        &self,
        path: &DocPath,
        fields: Value,
        must_exist: bool,
        counter: Option<&str>,
    ) -> Result<(), StoreError> {
        let key = path.to_string();
        self.check_allowed(&key)?;
        let fields = into_object(fields, path)?;
        {
            let mut entry = if must_exist {
                self.inner
                    .docs
                    .get_mut(&key)
                    .ok_or_else(|| StoreError::NotFound(key.clone()))?
            } else {
                self.inner.docs.entry(key.clone()).or_default()
            };
            for (field, value) in fields {
                entry.insert(field, value);
            }
            if let Some(counter) = counter {
                let next = entry.get(counter).and_then(Value::as_i64).unwrap_or(0) + 1;
                entry.insert(counter.to_string(), Value::from(next));
            }
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.notify(&path.collection());
        Ok(())
    }
}

fn into_object(value: Value, path: &DocPath) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "document {} must be an object, got {}",
            path, other
        ))),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        let key = path.to_string();
        self.check_allowed(&key)?;
        Ok(self
            .inner
            .docs
            .get(&key)
            .map(|doc| Value::Object(doc.clone())))
    }

    async fn merge(&self, path: &DocPath, fields: Value) -> Result<(), StoreError> {
        self.write(path, fields, false, None)
    }

    async fn update(&self, path: &DocPath, fields: Value) -> Result<(), StoreError> {
        self.write(path, fields, true, None)
    }

    async fn merge_incrementing(
        &self,
        path: &DocPath,
        fields: Value,
        counter: &str,
    ) -> Result<(), StoreError> {
        self.write(path, fields, false, Some(counter))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        self.check_allowed(&collection.to_string())?;
        Ok(self.list_sync(collection))
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        on_change: SnapshotCallback,
    ) -> Result<ListenerHandle, StoreError> {
        self.check_allowed(&collection.to_string())?;

        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.insert(
            id,
            Listener {
                collection: collection.to_string(),
                on_change: on_change.clone(),
            },
        );

        // Initial snapshot, like Firestore's first listener event
        on_change(self.list_sync(collection));

        let inner = Arc::downgrade(&self.inner);
        Ok(ListenerHandle::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.remove(&id);
            }
        }))
    }
}
