// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod billing;
pub mod callables;
pub mod customer;
pub mod navigation;
pub mod notify;
pub mod payment_session;
pub mod recovery;

pub use billing::{pricing_plans, BillingService, PlanPrice, PlanView, SubscriptionSummary};
pub use callables::{CallableError, CallableInvoker, ExtensionFunctions, HttpCallables};
pub use customer::CustomerService;
pub use navigation::{LoggingNavigator, Navigator, ReturnStatus};
pub use notify::{Notifier, Toast, ToastVariant};
pub use payment_session::{
    ErrorDisposition, FailureContext, JobPaymentOutcome, PaymentSession, PaymentState,
    SessionStatus,
};
pub use recovery::{is_recoverable, should_attempt_recovery};
