// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account doctor
//!
//! Diagnoses a user's payment setup: ensures the provider customer exists
//! and prints what the Stripe extension has mirrored for them.
//!
//! Usage: `account-doctor <uid>` with `FIREBASE_ID_TOKEN` set to an ID
//! token for that user.

use anyhow::Context;
use quickhire_payments::{
    config::Config,
    db::FirestoreStore,
    models::{subscription::most_recent_entitled, AuthUser},
    services::{HttpCallables, LoggingNavigator, SubscriptionSummary},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let uid = std::env::args()
        .nth(1)
        .context("usage: account-doctor <uid>")?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(project = %config.gcp_project_id, uid = %uid, "Starting account doctor");

    let store = FirestoreStore::new(&config.gcp_project_id)
        .await
        .context("Failed to connect to Firestore")?;
    let invoker = HttpCallables::from_config(&config);
    let state = AppState::new(
        config,
        Arc::new(store),
        Arc::new(invoker),
        Arc::new(LoggingNavigator),
    );

    let mut user = AuthUser::new(&uid);
    match std::env::var("FIREBASE_ID_TOKEN") {
        Ok(token) => user = user.with_id_token(token),
        Err(_) => tracing::warn!("FIREBASE_ID_TOKEN not set; callables will be unauthenticated"),
    }

    let profile = state.db.get_user_profile(&uid).await?;
    let customer = state.db.get_customer(&uid).await?;

    let ensured = state.customers.ensure_customer(Some(&user), None).await;
    if let Err(e) = &ensured {
        tracing::error!(uid = %uid, code = %e.code, error = %e, "Customer ensure failed");
    }

    let recovery_log = state.db.get_recovery_log(&uid).await?;
    let payment_attempts = state.db.get_payment_attempt_log(&uid).await?;
    let payment_methods = state.db.list_payment_methods(&uid).await?;
    let subscriptions = state.db.list_subscriptions(&uid).await?;
    let active = most_recent_entitled(&subscriptions).map(SubscriptionSummary::from_subscription);

    let ensure_report = match &ensured {
        Ok(customer_id) => serde_json::json!({ "ok": true, "customerId": customer_id }),
        Err(e) => serde_json::json!({ "ok": false, "code": e.code_str(), "message": e.message }),
    };

    let report = serde_json::json!({
        "uid": uid,
        "profile": {
            "exists": profile.is_some(),
            "hasEmail": profile.as_ref().and_then(|p| p.email()).is_some(),
            "stripeCustomerId": profile.as_ref().and_then(|p| p.stripe_customer_id.clone()),
        },
        "customerRecord": customer,
        "ensure": ensure_report,
        "recoveryLog": recovery_log,
        "paymentAttempts": payment_attempts,
        "paymentMethods": payment_methods,
        "subscriptions": subscriptions.len(),
        "activeSubscription": active,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quickhire_payments=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
