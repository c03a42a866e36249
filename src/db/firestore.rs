// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed [`DocumentStore`].
//!
//! Documents are read and written as untyped JSON objects; typed access lives
//! in [`crate::db::PaymentsDb`]. Collection listeners use Firestore's listen
//! API and re-read the collection whenever it reports a document change.

use crate::db::{
    CollectionPath, DocPath, Document, DocumentStore, ListenerHandle, SnapshotCallback, StoreError,
};
use ::firestore::{FirestoreListenEvent, FirestoreListenerTarget, FirestoreMemListenStateStorage};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Fields injected by the firestore crate when deserializing a document.
const INTERNAL_FIELD_PREFIX: &str = "_firestore_";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: ::firestore::FirestoreDb,
    next_target_id: Arc<AtomicU32>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // The emulator accepts any token; skip credential discovery entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = ::firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self::from_client(client))
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = ::firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = ::firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self::from_client(client))
    }

    fn from_client(client: ::firestore::FirestoreDb) -> Self {
        Self {
            client,
            next_target_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Full parent path for a collection (the database documents root for
    /// top-level collections).
    fn parent_path(&self, collection: &CollectionPath) -> String {
        let root = self.client.get_documents_path();
        let parent = collection.parent_segments();
        if parent.is_empty() {
            root.to_string()
        } else {
            format!("{}/{}", root, parent.join("/"))
        }
    }

    async fn list_with(
        client: &::firestore::FirestoreDb,
        parent: &str,
        collection: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let raw = client
            .fluent()
            .select()
            .from(collection)
            .parent(parent)
            .query()
            .await
            .map_err(map_err)?;

        let mut docs = raw
            .iter()
            .map(|doc| {
                let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
                let data: Value =
                    ::firestore::FirestoreDb::deserialize_doc_to(doc).map_err(map_err)?;
                Ok(Document {
                    id,
                    data: strip_internal_fields(data),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }
}

/// Classify a Firestore client error.
fn map_err(e: impl std::fmt::Display) -> StoreError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("permission") && lower.contains("denied") {
        StoreError::PermissionDenied(message)
    } else if lower.contains("not found") || lower.contains("notfound") {
        StoreError::NotFound(message)
    } else {
        StoreError::Backend(message)
    }
}

fn strip_internal_fields(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| !k.starts_with(INTERNAL_FIELD_PREFIX))
                .collect(),
        ),
        other => other,
    }
}

fn field_names(fields: &Value) -> Vec<String> {
    fields
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        let collection = path.collection();
        let parent = self.parent_path(&collection);
        let doc: Option<Value> = self
            .client
            .fluent()
            .select()
            .by_id_in(collection.name())
            .parent(&parent)
            .obj()
            .one(path.id())
            .await
            .map_err(map_err)?;
        Ok(doc.map(strip_internal_fields))
    }

    async fn merge(&self, path: &DocPath, fields: Value) -> Result<(), StoreError> {
        let collection = path.collection();
        let parent = self.parent_path(&collection);

        // Restricting the write to the given fields turns it into a merge
        let _: Value = self
            .client
            .fluent()
            .update()
            .fields(field_names(&fields))
            .in_col(collection.name())
            .document_id(path.id())
            .parent(&parent)
            .object(&fields)
            .execute()
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn merge_incrementing(
        &self,
        path: &DocPath,
        fields: Value,
        counter: &str,
    ) -> Result<(), StoreError> {
        let collection = path.collection();
        let parent = self.parent_path(&collection);

        // The counter is a server-side transform, outside the field mask
        let _: Value = self
            .client
            .fluent()
            .update()
            .fields(field_names(&fields))
            .in_col(collection.name())
            .document_id(path.id())
            .parent(&parent)
            .object(&fields)
            .transforms(|t| t.fields([t.field(counter).increment(1)]))
            .execute()
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Value) -> Result<(), StoreError> {
        // Existence check and write are not atomic; callers only use this
        // for diagnostic logs where a lost race is harmless.
        if self.get(path).await?.is_none() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        self.merge(path, fields).await
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let parent = self.parent_path(collection);
        Self::list_with(&self.client, &parent, collection.name()).await
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        on_change: SnapshotCallback,
    ) -> Result<ListenerHandle, StoreError> {
        let parent = self.parent_path(collection);
        let name = collection.name().to_string();
        let target_id = self.next_target_id.fetch_add(1, Ordering::SeqCst);

        let mut listener = self
            .client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(map_err)?;

        self.client
            .fluent()
            .select()
            .from(name.as_str())
            .parent(&parent)
            .listen()
            .add_target(FirestoreListenerTarget::new(target_id), &mut listener)
            .map_err(map_err)?;

        // Initial snapshot before any change events arrive
        on_change(Self::list_with(&self.client, &parent, &name).await?);

        let client = self.client.clone();
        let path_label = collection.to_string();
        listener
            .start(move |event| {
                let client = client.clone();
                let parent = parent.clone();
                let name = name.clone();
                let on_change = on_change.clone();
                let path_label = path_label.clone();
                async move {
                    if matches!(event, FirestoreListenEvent::TargetChange(_)) {
                        return Ok(());
                    }
                    match Self::list_with(&client, &parent, &name).await {
                        Ok(docs) => on_change(docs),
                        Err(e) => {
                            tracing::warn!(
                                collection = %path_label,
                                error = %e,
                                "Failed to refresh watched collection"
                            )
                        }
                    }
                    Ok(())
                }
            })
            .await
            .map_err(map_err)?;

        tracing::debug!(collection = %collection, target_id, "Collection listener started");

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            // Sender dropped or fired: either way the handle is gone
            let _ = stop_rx.await;
            if let Err(e) = listener.shutdown().await {
                tracing::warn!(error = %e, "Failed to shut down collection listener");
            }
        });

        Ok(ListenerHandle::new(move || {
            let _ = stop_tx.send(());
        }))
    }
}
