// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-scoped payment state.
//!
//! One [`PaymentSession`] exists per signed-in app session. It owns the
//! observable [`PaymentState`] and routes every payment-related side effect:
//! customer-ensure on login, error recovery, and redirects to the hosted
//! portal. Payment methods are never changed locally; every mutation goes
//! through the provider portal.

use crate::config::Config;
use crate::db::{collections, PaymentsDb};
use crate::error::{ErrorCode, PaymentError, Result};
use crate::i18n::Translator;
use crate::models::{AuthUser, PaymentMethod};
use crate::services::callables::ExtensionFunctions;
use crate::services::customer::CustomerService;
use crate::services::navigation::{paths, Navigator};
use crate::services::notify::{Notifier, Toast};
use crate::services::recovery::is_recoverable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Display time of the informational recovery toasts.
const RECOVERY_TOAST_DURATION: Duration = Duration::from_millis(3000);

/// Recorded as `type` in the payment-attempts log.
const JOB_ACCEPTANCE_ATTEMPT: &str = "job_acceptance";

/// Lifecycle of the session's payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
}

/// Observable payment state of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentState {
    pub status: SessionStatus,
    pub has_payment_method: bool,
    /// Always empty: methods are managed in the hosted portal
    pub payment_methods: Vec<PaymentMethod>,
    pub error: Option<PaymentError>,
    pub is_recovering: bool,
    pub customer_id: Option<String>,
}

/// Where a payment failure happened.
#[derive(Debug, Clone, Default)]
pub struct FailureContext {
    pub job_id: Option<String>,
    pub application_id: Option<String>,
}

impl FailureContext {
    pub fn job(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            application_id: None,
        }
    }

    pub fn with_application(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }
}

/// What [`PaymentSession::handle_payment_error`] did with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Customer repaired; the caller may retry
    Recovered,
    /// Repair attempted and failed; the error is now shown
    RecoveryFailed,
    /// Not recoverable; shown to the user directly
    Surfaced,
    /// The user changed while recovering; nothing was applied
    Discarded,
}

/// Outcome of a job-acceptance payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaymentOutcome {
    pub success: bool,
    pub error: Option<String>,
}

/// Payment state and operations for one app session.
pub struct PaymentSession {
    config: Config,
    customers: CustomerService,
    functions: ExtensionFunctions,
    db: PaymentsDb,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    translator: Translator,
    user: RwLock<Option<AuthUser>>,
    state: watch::Sender<PaymentState>,
    recovery_attempted: AtomicBool,
}

impl PaymentSession {
    pub fn new(
        config: Config,
        db: PaymentsDb,
        functions: ExtensionFunctions,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        translator: Translator,
    ) -> Self {
        let (state, _) = watch::channel(PaymentState::default());
        Self {
            customers: CustomerService::new(db.clone(), functions.clone()),
            config,
            functions,
            db,
            notifier,
            navigator,
            translator,
            user: RwLock::new(None),
            state,
            recovery_attempted: AtomicBool::new(false),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> PaymentState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<PaymentState> {
        self.state.subscribe()
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.user.read().await.clone()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Start the session for `user` and ensure its provider customer.
    ///
    /// A failed ensure leaves the session `Ready` without an error; the next
    /// payment failure goes through recovery instead.
    pub async fn login(&self, user: AuthUser) {
        let uid = user.uid.clone();
        *self.user.write().await = Some(user.clone());
        self.recovery_attempted.store(false, Ordering::SeqCst);
        self.state.send_replace(PaymentState {
            status: SessionStatus::Initializing,
            ..Default::default()
        });

        let result = self.customers.ensure_customer(Some(&user), None).await;

        if !self.is_current(&uid).await {
            tracing::debug!(
                uid = %uid,
                "Session changed during initialization, discarding result"
            );
            return;
        }

        match result {
            Ok(customer_id) => {
                tracing::info!(uid = %uid, customer_id = %customer_id, "Payment session ready");
                self.state.send_modify(|s| {
                    s.status = SessionStatus::Ready;
                    s.customer_id = Some(customer_id);
                    s.payment_methods.clear();
                    s.has_payment_method = false;
                });
            }
            Err(e) => {
                tracing::error!(
                    uid = %uid,
                    code = %e.code,
                    error = %e,
                    "Error ensuring payment customer"
                );
                self.state.send_modify(|s| s.status = SessionStatus::Ready);
            }
        }
    }

    /// End the session and reset all payment state.
    pub async fn logout(&self) {
        *self.user.write().await = None;
        self.recovery_attempted.store(false, Ordering::SeqCst);
        self.state.send_replace(PaymentState::default());
    }

    async fn is_current(&self, uid: &str) -> bool {
        self.user.read().await.as_ref().is_some_and(|u| u.uid == uid)
    }

    /// Payment methods live in the portal; this only clears the local list.
    pub async fn refresh_payment_methods(&self) {
        if self.user.read().await.is_none() {
            return;
        }
        self.state.send_modify(|s| {
            s.payment_methods.clear();
            s.has_payment_method = false;
        });
    }

    // ─── Errors ──────────────────────────────────────────────────

    /// Route a payment failure from elsewhere in the app.
    ///
    /// Recoverable errors trigger one customer-ensure while
    /// `is_recovering` is set. Everything else is shown to the user and the
    /// related job/application is marked as declined.
    pub async fn handle_payment_error(
        &self,
        error: &PaymentError,
        context: FailureContext,
    ) -> ErrorDisposition {
        tracing::error!(code = %error.code, error = %error, "Payment error");
        let user = self.current_user().await;

        if let Some(user) = user.as_ref().filter(|_| is_recoverable(error)) {
            self.notifier.notify(
                Toast::info(
                    self.translator.t("payment.recovering.title"),
                    self.translator.t("payment.recovering.description"),
                )
                .with_duration(RECOVERY_TOAST_DURATION),
            );
            self.state.send_modify(|s| s.is_recovering = true);

            let result = self.customers.ensure_customer(Some(user), None).await;

            if !self.is_current(&user.uid).await {
                tracing::debug!(
                    uid = %user.uid,
                    "Session changed during recovery, discarding result"
                );
                return ErrorDisposition::Discarded;
            }

            let disposition = match result {
                Ok(customer_id) => {
                    self.state.send_modify(|s| {
                        s.error = None;
                        s.customer_id = Some(customer_id);
                    });
                    self.notifier.notify(
                        Toast::info(
                            self.translator.t("payment.recovered.title"),
                            self.translator.t("payment.recovered.description"),
                        )
                        .with_duration(RECOVERY_TOAST_DURATION),
                    );
                    ErrorDisposition::Recovered
                }
                Err(recovery_error) => {
                    tracing::error!(uid = %user.uid, error = %recovery_error, "Recovery failed");
                    self.surface(error);
                    ErrorDisposition::RecoveryFailed
                }
            };

            self.state.send_modify(|s| s.is_recovering = false);
            return disposition;
        }

        self.surface(error);

        if let Some(user) = user {
            self.record_declined(&user.uid, &context).await;
        }

        ErrorDisposition::Surfaced
    }

    fn surface(&self, error: &PaymentError) {
        self.state.send_modify(|s| s.error = Some(error.clone()));
        self.notifier.notify(Toast::error(
            self.translator.t("payment.failed.title"),
            error.message.clone(),
        ));
    }

    /// Best-effort declined markers on the job, application and user.
    async fn record_declined(&self, uid: &str, context: &FailureContext) {
        let targets = [
            (collections::JOBS, context.job_id.as_deref()),
            (collections::APPLICATIONS, context.application_id.as_deref()),
        ];
        for (collection, id) in targets {
            let Some(id) = id else { continue };
            if let Err(e) = self.db.mark_payment_declined(collection, id).await {
                tracing::error!(
                    collection,
                    id,
                    error = %e,
                    "Error updating payment failure status"
                );
                return;
            }
        }

        if let Err(e) = self.db.mark_user_payment_issue(uid).await {
            tracing::error!(uid, error = %e, "Error updating payment failure status");
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Whether the user can pay. The provider validates at charge time.
    pub fn check_valid_payment(&self) -> bool {
        true
    }

    // ─── Portal Redirects ────────────────────────────────────────

    /// Redirects to the portal; returns `false` because nothing changed locally.
    pub async fn remove_payment_method(&self, payment_method_id: &str) -> bool {
        tracing::debug!(payment_method_id, "Removing payment method via portal");
        self.redirect_to_portal(paths::ACCOUNT).await;
        false
    }

    /// Redirects to the portal; returns `false` because nothing changed locally.
    pub async fn set_default_payment_method(&self, payment_method_id: &str) -> bool {
        tracing::debug!(payment_method_id, "Setting default payment method via portal");
        self.redirect_to_portal(paths::ACCOUNT).await;
        false
    }

    pub async fn add_payment_method(&self) -> bool {
        self.redirect_to_portal(paths::ACCOUNT_SETUP_COMPLETE).await;
        false
    }

    /// Fetch a portal link and navigate to it. Failures show a toast; no retry.
    async fn redirect_to_portal(&self, return_path: &str) {
        let Some(user) = self.current_user().await else {
            return;
        };

        match self.portal_url(&user, return_path).await {
            Ok(url) => self.navigator.assign(&url),
            Err(e) => {
                tracing::error!(uid = %user.uid, error = %e, "Error redirecting to payment portal");
                self.notifier.notify(Toast::error(
                    self.translator.t("payment.portalFailed.title"),
                    self.translator.t("payment.portalFailed.description"),
                ));
            }
        }
    }

    async fn portal_url(&self, user: &AuthUser, return_path: &str) -> Result<String> {
        let return_url = self.config.app_url(return_path);
        self.functions
            .create_portal_link(user.id_token.as_deref(), &return_url)
            .await?
            .ok_or_else(PaymentError::portal_failed)
    }

    // ─── Setup ───────────────────────────────────────────────────

    /// Send the user to the portal to add a payment method.
    ///
    /// A recoverable failure is repaired with a single customer-ensure, a
    /// fixed delay and one retry. Returns the portal URL on success.
    pub async fn setup_payment_method(&self) -> Option<String> {
        let Some(user) = self.current_user().await else {
            self.setup_guidance(&PaymentError::not_authenticated());
            return None;
        };
        self.state.send_modify(|s| s.error = None);

        let result = self.portal_url(&user, paths::ACCOUNT_SETUP_COMPLETE).await;
        if !self.is_current(&user.uid).await {
            return None;
        }

        let err = match result {
            Ok(url) => {
                self.navigator.assign(&url);
                return Some(url);
            }
            Err(e) => e,
        };
        tracing::warn!(uid = %user.uid, code = %err.code, error = %err, "Payment setup failed");

        if self.setup_guidance(&err) {
            return None;
        }

        let first_attempt = self
            .recovery_attempted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if !(is_recoverable(&err) && first_attempt) {
            self.state.send_modify(|s| s.error = Some(err.clone()));
            self.notifier.notify(Toast::error(
                self.translator.t("setup.failed.title"),
                err.message.clone(),
            ));
            return None;
        }

        self.notifier.notify(Toast::info(
            self.translator.t("setup.recovering.title"),
            self.translator.t("setup.recovering.description"),
        ));

        let result = self.recover_and_retry_setup(&user).await;
        if !self.is_current(&user.uid).await {
            tracing::debug!(
                uid = %user.uid,
                "Session changed during setup recovery, discarding result"
            );
            return None;
        }

        match result {
            Ok(None) => None,
            Ok(Some(url)) => {
                self.state.send_modify(|s| s.error = None);
                self.navigator.assign(&url);
                Some(url)
            }
            Err(recovery_error) => {
                tracing::error!(
                    uid = %user.uid,
                    error = %recovery_error,
                    "Payment setup recovery failed"
                );
                self.state.send_modify(|s| s.error = Some(recovery_error.clone()));
                let toast = match recovery_error.code {
                    ErrorCode::IncompleteProfile => Toast::error(
                        self.translator.t("setup.profileIncomplete.title"),
                        self.translator.t("setup.profileIncomplete.description"),
                    ),
                    ErrorCode::MissingEmail => Toast::error(
                        self.translator.t("setup.emailRequired.title"),
                        self.translator.t("setup.emailRequired.description"),
                    ),
                    _ => Toast::error(
                        self.translator.t("setup.recoveryFailed.title"),
                        self.translator.t("setup.recoveryFailed.description"),
                    ),
                };
                self.notifier.notify(toast);
                None
            }
        }
    }

    /// Ensure the customer, wait, and fetch the portal link again. `None`
    /// means the session changed before the retry.
    async fn recover_and_retry_setup(&self, user: &AuthUser) -> Result<Option<String>> {
        let customer_id = self.customers.ensure_customer(Some(user), None).await?;
        if !self.is_current(&user.uid).await {
            return Ok(None);
        }
        self.state.send_modify(|s| s.customer_id = Some(customer_id));
        tokio::time::sleep(self.config.recovery_retry_delay).await;

        self.notifier.notify(Toast::info(
            self.translator.t("setup.recovered.title"),
            self.translator.t("setup.recovered.description"),
        ));

        self.portal_url(user, paths::ACCOUNT_SETUP_COMPLETE)
            .await
            .map(Some)
    }

    /// Show guidance for errors only the user can fix. Returns whether the
    /// error was one of those.
    fn setup_guidance(&self, err: &PaymentError) -> bool {
        let keys = match err.code_str() {
            "stripe/incomplete-profile" => "setup.profileIncomplete",
            "stripe/missing-email" | "stripe/invalid-email" => "setup.emailRequired",
            "stripe/permission-denied"
            | "stripe/not-authenticated"
            | "auth/not-authenticated" => "setup.authError",
            _ => return false,
        };
        self.state.send_modify(|s| s.error = Some(err.clone()));
        self.notifier.notify(Toast::error(
            self.translator.t(&format!("{}.title", keys)),
            self.translator.t(&format!("{}.description", keys)),
        ));
        true
    }

    /// Allow the next setup failure to attempt recovery again.
    pub fn reset_setup(&self) {
        self.recovery_attempted.store(false, Ordering::SeqCst);
    }

    // ─── Job Acceptance ──────────────────────────────────────────

    /// Charge for accepting a job application.
    ///
    /// Failures are logged to `users/{uid}/logs/payment_attempts` and
    /// returned, never raised.
    pub async fn process_job_acceptance(
        &self,
        application_id: &str,
        job_id: &str,
    ) -> JobPaymentOutcome {
        tracing::info!(application_id, job_id, "Processing job acceptance payment");
        let user = self.current_user().await;

        match self
            .charge_job_acceptance(user.as_ref(), application_id, job_id)
            .await
        {
            Ok(()) => JobPaymentOutcome {
                success: true,
                error: None,
            },
            Err(err) => {
                tracing::error!(
                    application_id,
                    job_id,
                    code = %err.code,
                    error = %err,
                    "Error processing job acceptance payment"
                );
                if let Some(user) = &user {
                    if let Err(e) = self
                        .db
                        .log_payment_attempt_failed(
                            &user.uid,
                            JOB_ACCEPTANCE_ATTEMPT,
                            application_id,
                            job_id,
                            &err,
                        )
                        .await
                    {
                        tracing::warn!(
                            uid = %user.uid,
                            error = %e,
                            "Failed to log payment attempt"
                        );
                    }
                }
                JobPaymentOutcome {
                    success: false,
                    error: Some(err.message),
                }
            }
        }
    }

    async fn charge_job_acceptance(
        &self,
        user: Option<&AuthUser>,
        application_id: &str,
        job_id: &str,
    ) -> Result<()> {
        let user = user.ok_or_else(|| {
            PaymentError::new("User ID is required to process payment", ErrorCode::InvalidUser)
        })?;

        self.customers.ensure_customer(Some(user), None).await?;

        let result = self
            .functions
            .process_job_acceptance(user.id_token.as_deref(), application_id, job_id)
            .await?;
        if !result.success {
            return Err(PaymentError::new(
                result.message.unwrap_or_else(|| "Payment processing failed".to_string()),
                ErrorCode::PaymentFailed,
            ));
        }
        Ok(())
    }
}
