// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations over the payment-related documents.
//!
//! Provides high-level operations for:
//! - User profiles (`users/{uid}`)
//! - Customer records (`customers/{uid}`)
//! - Extension-synced mirrors (payment methods, subscriptions, products)
//! - Diagnostic logs (`users/{uid}/logs/*`)

use crate::db::{
    collections, CollectionPath, DocPath, Document, DocumentStore, ListenerHandle, StoreError,
};
use crate::error::PaymentError;
use crate::models::{
    CustomerRecord, PaymentAttemptLog, PaymentMethod, Price, Product, RecoveryLog, Subscription,
    UserProfile,
};
use crate::time_utils::now_rfc3339;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

/// Typed access to payment documents over any [`DocumentStore`].
#[derive(Clone)]
pub struct PaymentsDb {
    store: Arc<dyn DocumentStore>,
}

impl PaymentsDb {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn user_doc(uid: &str) -> DocPath {
        CollectionPath::root(collections::USERS).doc(uid)
    }

    fn customer_doc(uid: &str) -> DocPath {
        CollectionPath::root(collections::CUSTOMERS).doc(uid)
    }

    fn log_doc(uid: &str, log: &str) -> DocPath {
        Self::user_doc(uid).child(collections::LOGS).doc(log)
    }

    fn payment_methods_col(uid: &str) -> CollectionPath {
        Self::customer_doc(uid).child(collections::PAYMENT_METHODS)
    }

    fn subscriptions_col(uid: &str) -> CollectionPath {
        Self::customer_doc(uid).child(collections::SUBSCRIPTIONS)
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user profile by UID.
    pub async fn get_user_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        let doc = self.store.get(&Self::user_doc(uid)).await?;
        doc.map(|data| {
            serde_json::from_value(data)
                .map_err(|e| StoreError::Backend(format!("Malformed user profile {}: {}", uid, e)))
        })
        .transpose()
    }

    /// Record the provider customer ID on the user profile.
    pub async fn set_user_customer_id(
        &self,
        uid: &str,
        customer_id: &str,
    ) -> Result<(), StoreError> {
        self.store
            .merge(
                &Self::user_doc(uid),
                json!({
                    "stripeCustomerId": customer_id,
                    "updatedAt": now_rfc3339(),
                }),
            )
            .await
    }

    /// Flag the user as having an unresolved payment failure.
    pub async fn mark_user_payment_issue(&self, uid: &str) -> Result<(), StoreError> {
        self.store
            .update(
                &Self::user_doc(uid),
                json!({
                    "paymentIssue": true,
                    "lastPaymentFailure": now_rfc3339(),
                }),
            )
            .await
    }

    /// Mark a job or application document as having a declined payment.
    pub async fn mark_payment_declined(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        self.store
            .update(
                &CollectionPath::root(collection).doc(id),
                json!({
                    "paymentStatus": "failed",
                    "paymentDeclinedAt": now_rfc3339(),
                }),
            )
            .await
    }

    // ─── Customer Operations ─────────────────────────────────────

    pub async fn get_customer(&self, uid: &str) -> Result<Option<CustomerRecord>, StoreError> {
        let doc = self.store.get(&Self::customer_doc(uid)).await?;
        doc.map(|data| {
            serde_json::from_value(data)
                .map_err(|e| StoreError::Backend(format!("Malformed customer {}: {}", uid, e)))
        })
        .transpose()
    }

    /// Create or update the customer record.
    pub async fn upsert_customer(
        &self,
        uid: &str,
        customer_id: &str,
        email: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        self.store
            .merge(
                &Self::customer_doc(uid),
                json!({
                    "customerId": customer_id,
                    "email": email,
                    "name": name,
                    "updatedAt": now_rfc3339(),
                }),
            )
            .await
    }

    // ─── Recovery / Attempt Logs ─────────────────────────────────

    /// Read the customer-recovery log, if any attempt was recorded.
    pub async fn get_recovery_log(&self, uid: &str) -> Result<Option<RecoveryLog>, StoreError> {
        self.get_log(uid, collections::STRIPE_RECOVERY_LOG).await
    }

    pub async fn get_payment_attempt_log(
        &self,
        uid: &str,
    ) -> Result<Option<PaymentAttemptLog>, StoreError> {
        self.get_log(uid, collections::PAYMENT_ATTEMPTS_LOG).await
    }

    async fn get_log<T: DeserializeOwned>(
        &self,
        uid: &str,
        log: &str,
    ) -> Result<Option<T>, StoreError> {
        let doc = self.store.get(&Self::log_doc(uid, log)).await?;
        doc.map(|data| {
            serde_json::from_value(data).map_err(|e| {
                StoreError::Backend(format!("Malformed {} log for {}: {}", log, uid, e))
            })
        })
        .transpose()
    }

    pub async fn log_recovery_started(
        &self,
        uid: &str,
        triggered_from: &str,
    ) -> Result<(), StoreError> {
        let now = now_rfc3339();
        self.store
            .merge_incrementing(
                &Self::log_doc(uid, collections::STRIPE_RECOVERY_LOG),
                json!({
                    "lastAttemptAt": now,
                    "triggeredFrom": triggered_from,
                    "status": "started",
                    "metadata": {
                        "client": concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
                        "timestamp": now,
                    },
                }),
                "attempts",
            )
            .await
    }

    pub async fn log_recovery_completed(
        &self,
        uid: &str,
        customer_id: &str,
    ) -> Result<(), StoreError> {
        self.store
            .update(
                &Self::log_doc(uid, collections::STRIPE_RECOVERY_LOG),
                json!({
                    "status": "completed",
                    "customerId": customer_id,
                    "customerCreated": true,
                    "completedAt": now_rfc3339(),
                    "result": "success",
                }),
            )
            .await
    }

    pub async fn log_recovery_failed(
        &self,
        uid: &str,
        error: &PaymentError,
    ) -> Result<(), StoreError> {
        self.store
            .update(
                &Self::log_doc(uid, collections::STRIPE_RECOVERY_LOG),
                json!({
                    "status": "failed",
                    "error": error.message,
                    "errorCode": error.code_str(),
                    "failedAt": now_rfc3339(),
                    "result": "error",
                }),
            )
            .await
    }

    pub async fn log_payment_attempt_failed(
        &self,
        uid: &str,
        attempt_type: &str,
        application_id: &str,
        job_id: &str,
        error: &PaymentError,
    ) -> Result<(), StoreError> {
        self.store
            .merge_incrementing(
                &Self::log_doc(uid, collections::PAYMENT_ATTEMPTS_LOG),
                json!({
                    "lastAttemptAt": now_rfc3339(),
                    "type": attempt_type,
                    "status": "failed",
                    "applicationId": application_id,
                    "jobId": job_id,
                    "error": error.message,
                    "errorCode": error.code_str(),
                }),
                "attempts",
            )
            .await
    }

    // ─── Extension Mirrors (read-only) ───────────────────────────

    pub async fn list_payment_methods(&self, uid: &str) -> Result<Vec<PaymentMethod>, StoreError> {
        let docs = self.store.list(&Self::payment_methods_col(uid)).await?;
        Ok(decode_all(&docs))
    }

    pub async fn list_subscriptions(&self, uid: &str) -> Result<Vec<Subscription>, StoreError> {
        let docs = self.store.list(&Self::subscriptions_col(uid)).await?;
        Ok(decode_all(&docs))
    }

    /// Watch a user's payment methods.
    pub async fn watch_payment_methods<F>(
        &self,
        uid: &str,
        on_change: F,
    ) -> Result<ListenerHandle, StoreError>
    where
        F: Fn(Vec<PaymentMethod>) + Send + Sync + 'static,
    {
        self.store
            .subscribe(
                &Self::payment_methods_col(uid),
                Arc::new(move |docs: Vec<Document>| on_change(decode_all(&docs))),
            )
            .await
    }

    /// Watch a user's subscriptions.
    pub async fn watch_subscriptions<F>(
        &self,
        uid: &str,
        on_change: F,
    ) -> Result<ListenerHandle, StoreError>
    where
        F: Fn(Vec<Subscription>) + Send + Sync + 'static,
    {
        self.store
            .subscribe(
                &Self::subscriptions_col(uid),
                Arc::new(move |docs: Vec<Document>| on_change(decode_all(&docs))),
            )
            .await
    }

    /// All products, without prices attached.
    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let docs = self.store.list(&CollectionPath::root(collections::PRODUCTS)).await?;
        Ok(decode_all(&docs))
    }

    /// Prices of one product.
    pub async fn list_prices(&self, product_id: &str) -> Result<Vec<Price>, StoreError> {
        let col = CollectionPath::root(collections::PRODUCTS)
            .doc(product_id)
            .child(collections::PRICES);
        let docs = self.store.list(&col).await?;
        Ok(decode_all(&docs))
    }
}

/// Decode documents, skipping (and logging) any that do not fit the model.
fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}
