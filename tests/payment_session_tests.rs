// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment session state machine tests.

use quickhire_payments::error::{ErrorCode, PaymentError};
use quickhire_payments::models::AuthUser;
use quickhire_payments::services::callables::names;
use quickhire_payments::services::{
    CallableError, ErrorDisposition, FailureContext, PaymentState, SessionStatus, ToastVariant,
};
use serde_json::json;

mod common;
use common::{create_test_app, customer_created, seed_user, url_response, TestApp};

const PORTAL_URL: &str = "https://billing.stripe.test/p/session/abc";

/// App with a complete profile for `u1` and a working create-customer.
fn app_with_customer() -> TestApp {
    let app = create_test_app();
    seed_user(&app.store, "u1", "pat@quickhire.example");
    app.callables.respond(names::CREATE_CUSTOMER, customer_created("cus_123"));
    app
}

fn test_user() -> AuthUser {
    AuthUser::new("u1").with_id_token("token-u1")
}

fn missing_customer_error() -> PaymentError {
    PaymentError::new(
        "No such customer: cus_old",
        ErrorCode::Other("resource_missing".into()),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_login_ensures_customer() {
    let app = app_with_customer();
    let session = app.session();
    let rx = session.watch();
    assert_eq!(session.state().status, SessionStatus::Uninitialized);

    session.login(test_user()).await;

    let state = session.state();
    assert_eq!(state.status, SessionStatus::Ready);
    assert_eq!(state.customer_id.as_deref(), Some("cus_123"));
    assert!(state.payment_methods.is_empty());
    assert!(!state.has_payment_method);
    assert!(state.error.is_none());
    assert_eq!(rx.borrow().status, SessionStatus::Ready);
}

#[tokio::test]
async fn test_login_failure_is_silent() {
    let app = create_test_app();
    let session = app.session();

    session.login(test_user()).await;

    let state = session.state();
    assert_eq!(state.status, SessionStatus::Ready);
    assert!(state.customer_id.is_none());
    assert!(state.error.is_none());
    assert!(app.notifier.toasts().is_empty());
}

#[tokio::test]
async fn test_logout_resets_state() {
    let app = app_with_customer();
    let session = app.session();
    session.login(test_user()).await;

    session.logout().await;

    assert_eq!(session.state().status, SessionStatus::Uninitialized);
    assert!(session.state().customer_id.is_none());
    assert!(session.current_user().await.is_none());
}

#[tokio::test]
async fn test_portal_only_helpers() {
    let app = app_with_customer();
    let session = app.session();
    session.login(test_user()).await;

    session.refresh_payment_methods().await;
    assert!(session.state().payment_methods.is_empty());
    assert!(session.check_valid_payment());
}

// ═══════════════════════════════════════════════════════════════════════════
// PORTAL REDIRECTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_remove_and_set_default_navigate_to_portal() {
    let app = app_with_customer();
    app.callables.respond(names::CREATE_PORTAL_LINK, url_response(PORTAL_URL));
    let session = app.session();
    session.login(test_user()).await;
    let before = session.state();

    assert!(!session.remove_payment_method("pm_1").await);
    assert!(!session.set_default_payment_method("pm_2").await);

    assert_eq!(app.navigator.urls(), vec![PORTAL_URL, PORTAL_URL]);
    assert_eq!(session.state(), before, "local state must not change");

    let calls = app.callables.calls_to(names::CREATE_PORTAL_LINK);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].data["return_url"], "https://app.quickhire.test/account");
    assert_eq!(calls[0].id_token.as_deref(), Some("token-u1"));
}

#[tokio::test]
async fn test_add_payment_method_returns_with_setup_flag() {
    let app = app_with_customer();
    app.callables.respond(names::CREATE_PORTAL_LINK, url_response(PORTAL_URL));
    let session = app.session();
    session.login(test_user()).await;

    assert!(!session.add_payment_method().await);

    let calls = app.callables.calls_to(names::CREATE_PORTAL_LINK);
    assert_eq!(
        calls[0].data["return_url"],
        "https://app.quickhire.test/account?setup=complete"
    );
    assert_eq!(app.navigator.urls(), vec![PORTAL_URL]);
}

#[tokio::test]
async fn test_portal_failure_shows_toast_without_retry() {
    let app = app_with_customer();
    app.callables.respond(
        names::CREATE_PORTAL_LINK,
        Err(CallableError::new("internal", "portal unavailable")),
    );
    let session = app.session();
    session.login(test_user()).await;

    assert!(!session.remove_payment_method("pm_1").await);

    assert_eq!(app.callables.calls_to(names::CREATE_PORTAL_LINK).len(), 1);
    assert!(app.navigator.urls().is_empty());
    let toasts = app.notifier.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "Error");
    assert_eq!(toasts[0].variant, ToastVariant::Destructive);
}

#[tokio::test]
async fn test_portal_redirect_requires_user() {
    let app = app_with_customer();
    app.callables.respond(names::CREATE_PORTAL_LINK, url_response(PORTAL_URL));
    let session = app.session();

    assert!(!session.remove_payment_method("pm_1").await);
    assert!(app.navigator.urls().is_empty());
    assert!(app.callables.calls().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// ERROR HANDLING
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_recoverable_error_repairs_customer() {
    let app = app_with_customer();
    let session = app.session();
    session.login(test_user()).await;
    let calls_before = app.callables.calls_to(names::CREATE_CUSTOMER).len();

    let error = missing_customer_error();
    let disposition = session
        .handle_payment_error(&error, FailureContext::default())
        .await;

    assert_eq!(disposition, ErrorDisposition::Recovered);
    assert_eq!(app.callables.calls_to(names::CREATE_CUSTOMER).len(), calls_before + 1);
    assert_eq!(
        app.notifier.titles(),
        vec!["Updating payment profile", "Payment profile updated"]
    );
    let state = session.state();
    assert!(state.error.is_none());
    assert!(!state.is_recovering);
}

#[tokio::test]
async fn test_failed_recovery_surfaces_original_error() {
    // No profile: every ensure fails
    let app = create_test_app();
    let session = app.session();
    session.login(test_user()).await;

    let error = missing_customer_error();
    let disposition = session
        .handle_payment_error(&error, FailureContext::default())
        .await;

    assert_eq!(disposition, ErrorDisposition::RecoveryFailed);
    let state = session.state();
    assert_eq!(state.error, Some(error.clone()));
    assert!(!state.is_recovering);

    let toasts = app.notifier.toasts();
    let last = toasts.last().unwrap();
    assert_eq!(last.title, "Payment Failed");
    assert_eq!(last.description, error.message);
    assert_eq!(last.variant, ToastVariant::Destructive);
}

#[tokio::test]
async fn test_unrecoverable_error_marks_declined() {
    let app = app_with_customer();
    app.store.seed("jobs/job1", json!({ "title": "Framing" })).unwrap();
    app.store.seed("applications/app1", json!({ "jobId": "job1" })).unwrap();
    let session = app.session();
    session.login(test_user()).await;
    let customer_calls = app.callables.calls_to(names::CREATE_CUSTOMER).len();

    let error = PaymentError::new(
        "Your card was declined.",
        ErrorCode::Other("card_declined".into()),
    );
    let disposition = session
        .handle_payment_error(&error, FailureContext::job("job1").with_application("app1"))
        .await;

    assert_eq!(disposition, ErrorDisposition::Surfaced);
    assert_eq!(app.callables.calls_to(names::CREATE_CUSTOMER).len(), customer_calls);
    assert_eq!(session.state().error, Some(error));
    assert_eq!(app.store.snapshot("jobs/job1").unwrap()["paymentStatus"], "failed");
    assert_eq!(app.store.snapshot("applications/app1").unwrap()["paymentStatus"], "failed");
    assert_eq!(app.store.snapshot("users/u1").unwrap()["paymentIssue"], true);
    assert_eq!(app.notifier.titles(), vec!["Payment Failed"]);
}

#[tokio::test]
async fn test_permission_error_never_recovers() {
    let app = app_with_customer();
    let session = app.session();
    session.login(test_user()).await;
    let customer_calls = app.callables.calls_to(names::CREATE_CUSTOMER).len();

    let error = PaymentError::new(
        "Permission denied: customer not found",
        ErrorCode::Other("not-found".into()),
    );
    let disposition = session
        .handle_payment_error(&error, FailureContext::default())
        .await;

    assert_eq!(disposition, ErrorDisposition::Surfaced);
    assert_eq!(app.callables.calls_to(names::CREATE_CUSTOMER).len(), customer_calls);
}

#[tokio::test]
async fn test_recoverable_error_without_user_is_surfaced() {
    let app = app_with_customer();
    let session = app.session();

    let error = PaymentError::new("Customer not found", ErrorCode::Other("not-found".into()));
    let disposition = session
        .handle_payment_error(&error, FailureContext::job("job1"))
        .await;

    assert_eq!(disposition, ErrorDisposition::Surfaced);
    assert_eq!(app.store.write_count(), 0);

    session.clear_error();
    assert!(session.state().error.is_none());
}

#[tokio::test]
async fn test_logout_during_recovery_discards_result() {
    let app = app_with_customer();
    let session = app.session();
    session.login(test_user()).await;
    let calls_before = app.callables.calls_to(names::CREATE_CUSTOMER).len();
    app.callables.hold(names::CREATE_CUSTOMER);

    let error = missing_customer_error();
    let (disposition, ()) = tokio::join!(
        session.handle_payment_error(&error, FailureContext::default()),
        async {
            app.callables
                .wait_for_calls(names::CREATE_CUSTOMER, calls_before + 1)
                .await;
            session.logout().await;
            app.callables.release(names::CREATE_CUSTOMER);
        }
    );

    assert_eq!(disposition, ErrorDisposition::Discarded);
    assert_eq!(session.state(), PaymentState::default());
    assert!(session.current_user().await.is_none());
    assert_eq!(app.notifier.titles(), vec!["Updating payment profile"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// SETUP
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_setup_recovers_once_and_retries() {
    let app = app_with_customer();
    app.callables.respond(
        names::CREATE_PORTAL_LINK,
        Err(CallableError::new("not-found", "No such customer: cus_old")),
    );
    app.callables.respond(names::CREATE_PORTAL_LINK, url_response(PORTAL_URL));
    let session = app.session();
    session.login(test_user()).await;
    let customer_calls = app.callables.calls_to(names::CREATE_CUSTOMER).len();

    let url = session.setup_payment_method().await;

    assert_eq!(url.as_deref(), Some(PORTAL_URL));
    assert_eq!(app.navigator.urls(), vec![PORTAL_URL]);
    assert_eq!(app.callables.calls_to(names::CREATE_CUSTOMER).len(), customer_calls + 1);
    assert_eq!(app.callables.calls_to(names::CREATE_PORTAL_LINK).len(), 2);
    assert_eq!(
        app.notifier.titles(),
        vec!["Recovering payment profile", "Recovery successful"]
    );
    assert!(session.state().error.is_none());
}

#[tokio::test]
async fn test_setup_recovery_is_attempted_once_until_reset() {
    let app = app_with_customer();
    app.callables.respond(
        names::CREATE_PORTAL_LINK,
        Err(CallableError::new("failed-precondition", "Customer setup incomplete")),
    );
    let session = app.session();
    session.login(test_user()).await;
    let customer_calls = app.callables.calls_to(names::CREATE_CUSTOMER).len();

    assert!(session.setup_payment_method().await.is_none());
    assert_eq!(app.notifier.titles().last().unwrap(), "Recovery failed");

    assert!(session.setup_payment_method().await.is_none());
    assert_eq!(app.notifier.titles().last().unwrap(), "Payment setup failed");
    assert_eq!(app.callables.calls_to(names::CREATE_CUSTOMER).len(), customer_calls + 1);

    session.reset_setup();
    assert!(session.setup_payment_method().await.is_none());
    assert_eq!(app.callables.calls_to(names::CREATE_CUSTOMER).len(), customer_calls + 2);
    assert!(app.navigator.urls().is_empty());
}

#[tokio::test]
async fn test_setup_validation_errors_need_user_action() {
    let app = app_with_customer();
    app.callables.respond(
        names::CREATE_PORTAL_LINK,
        Err(CallableError::new(
            "stripe/incomplete-profile",
            "Your user profile is incomplete.",
        )),
    );
    let session = app.session();
    session.login(test_user()).await;
    let customer_calls = app.callables.calls_to(names::CREATE_CUSTOMER).len();

    assert!(session.setup_payment_method().await.is_none());

    assert_eq!(app.notifier.titles(), vec!["Profile Incomplete"]);
    assert_eq!(app.callables.calls_to(names::CREATE_CUSTOMER).len(), customer_calls);
    assert_eq!(
        session.state().error.map(|e| e.code),
        Some(ErrorCode::IncompleteProfile)
    );
}

#[tokio::test]
async fn test_logout_during_setup_recovery_skips_retry() {
    let app = app_with_customer();
    app.callables.respond(
        names::CREATE_PORTAL_LINK,
        Err(CallableError::new("not-found", "No such customer: cus_old")),
    );
    app.callables.respond(names::CREATE_PORTAL_LINK, url_response(PORTAL_URL));
    let session = app.session();
    session.login(test_user()).await;
    let calls_before = app.callables.calls_to(names::CREATE_CUSTOMER).len();
    app.callables.hold(names::CREATE_CUSTOMER);

    let (url, ()) = tokio::join!(session.setup_payment_method(), async {
        app.callables
            .wait_for_calls(names::CREATE_CUSTOMER, calls_before + 1)
            .await;
        session.logout().await;
        app.callables.release(names::CREATE_CUSTOMER);
    });

    assert!(url.is_none());
    assert!(app.navigator.urls().is_empty());
    assert_eq!(app.callables.calls_to(names::CREATE_PORTAL_LINK).len(), 1);
    assert_eq!(session.state(), PaymentState::default());
    assert_eq!(app.notifier.titles(), vec!["Recovering payment profile"]);
}

#[tokio::test]
async fn test_setup_without_user_asks_for_login() {
    let app = app_with_customer();
    let session = app.session();

    assert!(session.setup_payment_method().await.is_none());
    assert_eq!(app.notifier.titles(), vec!["Authentication Error"]);
    assert!(app.callables.calls().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// JOB ACCEPTANCE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_job_acceptance_success() {
    let app = app_with_customer();
    app.callables.respond(names::PROCESS_JOB_ACCEPTANCE, Ok(json!({ "success": true })));
    let session = app.session();
    session.login(test_user()).await;

    let outcome = session.process_job_acceptance("app1", "job1").await;

    assert!(outcome.success);
    assert!(outcome.error.is_none());
    let calls = app.callables.calls_to(names::PROCESS_JOB_ACCEPTANCE);
    assert_eq!(calls[0].data, json!({ "applicationId": "app1", "jobId": "job1" }));
    assert!(app.store.snapshot("users/u1/logs/payment_attempts").is_none());
}

#[tokio::test]
async fn test_job_acceptance_failure_is_logged() {
    let app = app_with_customer();
    app.callables.respond(
        names::PROCESS_JOB_ACCEPTANCE,
        Ok(json!({ "success": false, "message": "Card declined" })),
    );
    let session = app.session();
    session.login(test_user()).await;

    let outcome = session.process_job_acceptance("app1", "job1").await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Card declined"));

    let log = app.store.snapshot("users/u1/logs/payment_attempts").unwrap();
    assert_eq!(log["type"], "job_acceptance");
    assert_eq!(log["status"], "failed");
    assert_eq!(log["applicationId"], "app1");
    assert_eq!(log["jobId"], "job1");
    assert_eq!(log["errorCode"], "stripe/payment-failed");
    assert_eq!(log["attempts"], 1);

    let typed = app.state.db.get_payment_attempt_log("u1").await.unwrap().unwrap();
    assert_eq!(typed.attempt_type, "job_acceptance");
    assert_eq!(typed.error.as_deref(), Some("Card declined"));
}

#[tokio::test]
async fn test_job_acceptance_requires_user() {
    let app = app_with_customer();
    let session = app.session();

    let outcome = session.process_job_acceptance("app1", "job1").await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("User ID is required to process payment")
    );
    assert_eq!(app.store.write_count(), 0);
}
