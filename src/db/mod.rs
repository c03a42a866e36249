//! Database layer (Firestore).
//!
//! Everything above this module talks to a [`DocumentStore`], a small
//! capability interface over document reads, merges and collection
//! listeners. [`FirestoreStore`] backs it in production and [`MemoryStore`]
//! in tests and offline runs.

pub mod firestore;
pub mod memory;
pub mod payments;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use payments::PaymentsDb;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CUSTOMERS: &str = "customers";
    pub const PRODUCTS: &str = "products";
    pub const JOBS: &str = "jobs";
    pub const APPLICATIONS: &str = "applications";
    /// Subcollections
    pub const PAYMENT_METHODS: &str = "payment_methods";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const PRICES: &str = "prices";
    pub const LOGS: &str = "logs";
    /// Log document IDs under `users/{uid}/logs`
    pub const STRIPE_RECOVERY_LOG: &str = "stripe_recovery";
    pub const PAYMENT_ATTEMPTS_LOG: &str = "payment_attempts";
}

/// Errors reported by a document store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Database error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Firestore-style status code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not-found",
            StoreError::PermissionDenied(_) => "permission-denied",
            StoreError::InvalidPath(_) => "invalid-argument",
            StoreError::Backend(_) => "unavailable",
        }
    }
}

impl From<StoreError> for crate::error::PaymentError {
    fn from(e: StoreError) -> Self {
        crate::error::PaymentError::new(e.to_string(), e.code().into())
    }
}

/// Slash-separated path to a document, e.g. `users/abc/logs/stripe_recovery`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath(Vec<String>);

impl DocPath {
    pub fn new<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty())
        {
            return Err(StoreError::InvalidPath(segments.join("/")));
        }
        Ok(Self(segments))
    }

    pub fn parse(path: &str) -> Result<Self, StoreError> {
        Self::new(path.trim_matches('/').split('/'))
    }

    /// Document ID (last segment).
    pub fn id(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    /// Collection containing this document.
    pub fn collection(&self) -> CollectionPath {
        CollectionPath(self.0[..self.0.len() - 1].to_vec())
    }

    /// Subcollection under this document.
    pub fn child(&self, collection: &str) -> CollectionPath {
        let mut segments = self.0.clone();
        segments.push(collection.to_string());
        CollectionPath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Slash-separated path to a collection, e.g. `customers/abc/subscriptions`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    pub fn new<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.len() % 2 != 1 || segments.iter().any(|s| s.is_empty()) {
            return Err(StoreError::InvalidPath(segments.join("/")));
        }
        Ok(Self(segments))
    }

    pub fn root(name: &str) -> Self {
        CollectionPath(vec![name.to_string()])
    }

    pub fn parse(path: &str) -> Result<Self, StoreError> {
        Self::new(path.trim_matches('/').split('/'))
    }

    /// Collection name (last segment).
    pub fn name(&self) -> &str {
        &self.0[self.0.len() - 1]
    }

    /// Parent document segments (empty for root collections).
    pub fn parent_segments(&self) -> &[String] {
        &self.0[..self.0.len() - 1]
    }

    pub fn doc(&self, id: &str) -> DocPath {
        let mut segments = self.0.clone();
        segments.push(id.to_string());
        DocPath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A document snapshot: ID plus field data.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Decode into a model, injecting the document ID as `id`.
    ///
    /// Top-level `null` fields are dropped first so that serde defaults apply
    /// to them the same way they do to missing fields.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut data = match &self.data {
            Value::Object(map) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => serde_json::Map::new(),
        };
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data))
    }
}

/// Callback receiving the full current contents of a watched collection.
pub type SnapshotCallback = Arc<dyn Fn(Vec<Document>) + Send + Sync>;

/// Live listener registration. Dropping it unsubscribes.
pub struct ListenerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerHandle {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving snapshots.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Document storage capability.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if it does not exist.
    async fn get(&self, path: &DocPath) -> Result<Option<Value>, StoreError>;

    /// Merge top-level fields into a document, creating it if needed.
    async fn merge(&self, path: &DocPath, fields: Value) -> Result<(), StoreError>;

    /// Merge top-level fields into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, path: &DocPath, fields: Value) -> Result<(), StoreError>;

    /// Merge `fields` and atomically add one to the integer field `counter`
    /// (absent counts as zero), creating the document if needed.
    async fn merge_incrementing(
        &self,
        path: &DocPath,
        fields: Value,
        counter: &str,
    ) -> Result<(), StoreError>;

    /// All documents of a collection, ordered by ID.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    /// Watch a collection. `on_change` receives the current contents once on
    /// registration and again after every change, until the handle drops.
    async fn subscribe(
        &self,
        collection: &CollectionPath,
        on_change: SnapshotCallback,
    ) -> Result<ListenerHandle, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let doc = DocPath::parse("users/u1/logs/stripe_recovery").unwrap();
        assert_eq!(doc.id(), "stripe_recovery");
        assert_eq!(doc.collection().to_string(), "users/u1/logs");
        assert_eq!(doc.collection().parent_segments(), ["users", "u1"]);

        assert!(DocPath::parse("users").is_err());
        assert!(CollectionPath::parse("users/u1").is_err());

        let col = CollectionPath::root(collections::CUSTOMERS)
            .doc("u1")
            .child(collections::SUBSCRIPTIONS);
        assert_eq!(col.to_string(), "customers/u1/subscriptions");
    }

    #[test]
    fn test_decode_drops_nulls_and_injects_id() {
        let doc = Document {
            id: "pm_1".to_string(),
            data: serde_json::json!({"type": null, "card": null, "isDefault": true}),
        };
        let method: crate::models::PaymentMethod = doc.decode().unwrap();
        assert_eq!(method.id, "pm_1");
        assert_eq!(method.method_type, "card");
        assert_eq!(method.card.last4, "****");
        assert!(method.is_default);
    }
}
