// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! QuickHireCrew payments: the payment and subscription layer.
//!
//! This crate keeps a thin client-side view of payment state whose source
//! of truth is the Stripe Firestore extension. It ensures provider
//! customers exist, repairs them after recoverable failures, mirrors
//! extension-synced documents and hands every mutation to hosted pages.

rust_i18n::i18n!("locales", fallback = "en");

pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod models;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{DocumentStore, PaymentsDb};
use i18n::Translator;
use services::{
    BillingService, CallableInvoker, CustomerService, ExtensionFunctions, Navigator, Notifier,
    PaymentSession,
};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: PaymentsDb,
    pub functions: ExtensionFunctions,
    pub customers: CustomerService,
    pub billing: BillingService,
    navigator: Arc<dyn Navigator>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        invoker: Arc<dyn CallableInvoker>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let db = PaymentsDb::new(store);
        let functions = ExtensionFunctions::new(invoker);
        Self {
            customers: CustomerService::new(db.clone(), functions.clone()),
            billing: BillingService::new(
                config.clone(),
                db.clone(),
                functions.clone(),
                Arc::clone(&navigator),
            ),
            config,
            db,
            functions,
            navigator,
        }
    }

    /// Create a payment session for one signed-in user session.
    pub fn session(&self, notifier: Arc<dyn Notifier>, translator: Translator) -> PaymentSession {
        PaymentSession::new(
            self.config.clone(),
            self.db.clone(),
            self.functions.clone(),
            notifier,
            Arc::clone(&self.navigator),
            translator,
        )
    }
}
