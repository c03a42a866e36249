// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Customer-ensure: guarantee a payment-provider customer exists for a user.
//!
//! Every step is mirrored into `users/{uid}/logs/stripe_recovery` on a
//! best-effort basis; log writes never change the outcome.

use crate::db::PaymentsDb;
use crate::error::{PaymentError, Result};
use crate::models::AuthUser;
use crate::services::callables::ExtensionFunctions;
use validator::Validate;

/// Recorded as `triggeredFrom` in the recovery log.
const TRIGGERED_FROM: &str = "ensureStripeCustomer";

/// Payload sent to the create-customer callable.
#[derive(Debug, Validate)]
struct CreateCustomerRequest {
    #[validate(email)]
    email: String,
    name: String,
}

/// Ensures provider customers exist.
#[derive(Clone)]
pub struct CustomerService {
    db: PaymentsDb,
    functions: ExtensionFunctions,
}

impl CustomerService {
    pub fn new(db: PaymentsDb, functions: ExtensionFunctions) -> Self {
        Self { db, functions }
    }

    /// Ensure a provider customer exists and return its ID.
    ///
    /// `user_id` defaults to `current_user`'s UID. Fails with
    /// `stripe/not-authenticated` (and writes nothing) when neither is given.
    pub async fn ensure_customer(
        &self,
        current_user: Option<&AuthUser>,
        user_id: Option<&str>,
    ) -> Result<String> {
        let uid = match user_id
            .filter(|id| !id.is_empty())
            .or(current_user.map(|u| u.uid.as_str()))
        {
            Some(uid) => uid.to_string(),
            None => return Err(PaymentError::not_authenticated()),
        };
        let id_token = current_user.and_then(|u| u.id_token.as_deref());

        if let Err(e) = self.db.log_recovery_started(&uid, TRIGGERED_FROM).await {
            tracing::warn!(uid = %uid, error = %e, "Failed to log recovery attempt");
        }

        match self.create_and_record(&uid, id_token).await {
            Ok(customer_id) => Ok(customer_id),
            Err(err) => {
                tracing::error!(
                    uid = %uid,
                    code = %err.code,
                    error = %err,
                    "Ensuring payment customer failed"
                );
                if let Err(e) = self.db.log_recovery_failed(&uid, &err).await {
                    tracing::warn!(uid = %uid, error = %e, "Failed to log recovery failure");
                }
                Err(classify_failure(err))
            }
        }
    }

    async fn create_and_record(&self, uid: &str, id_token: Option<&str>) -> Result<String> {
        let profile = self
            .db
            .get_user_profile(uid)
            .await?
            .ok_or_else(PaymentError::incomplete_profile)?;

        let email = profile.email().ok_or_else(PaymentError::missing_email)?;
        let request = CreateCustomerRequest {
            email: email.to_string(),
            name: profile.customer_name(),
        };
        request.validate().map_err(|_| PaymentError::invalid_email())?;

        tracing::info!(uid, "Ensuring payment customer exists");
        let customer_id = self
            .functions
            .create_customer(id_token, &request.email, &request.name)
            .await?;
        if customer_id.is_empty() {
            return Err(PaymentError::api_error());
        }

        tracing::info!(uid, customer_id = %customer_id, "Payment customer ensured");

        if let Err(e) = self.db.log_recovery_completed(uid, &customer_id).await {
            tracing::warn!(uid, error = %e, "Failed to log recovery completion");
        }

        if let Err(e) = self
            .db
            .upsert_customer(uid, &customer_id, &request.email, &request.name)
            .await
        {
            tracing::error!(uid, error = %e, "Failed to update customer record");
        }

        if let Err(e) = self.db.set_user_customer_id(uid, &customer_id).await {
            tracing::warn!(uid, error = %e, "Could not update user document with customer ID");
        }

        Ok(customer_id)
    }
}

/// Re-raise our own errors; translate upstream ones into user guidance.
fn classify_failure(err: PaymentError) -> PaymentError {
    if err.code.is_own() {
        return err;
    }

    let message = err.message.to_lowercase();
    if message.contains("not found") || message.contains("profile") {
        PaymentError::new(
            "Your user profile is incomplete. Please complete your profile setup first.",
            crate::error::ErrorCode::IncompleteProfile,
        )
    } else if message.contains("email") {
        PaymentError::invalid_email()
    } else if message.contains("permission") {
        PaymentError::permission_denied()
    } else if message.contains("stripe") || message.contains("customer") {
        PaymentError::api_error()
    } else {
        PaymentError::customer_creation_failed()
    }
}
