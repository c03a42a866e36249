// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscriptions: catalog, pricing plans, checkout and the customer portal.
//!
//! Reads only the documents the Stripe extension mirrors into Firestore.
//! Purchases and plan changes happen in hosted checkout/portal pages.

use crate::config::Config;
use crate::db::{ListenerHandle, PaymentsDb, StoreError};
use crate::error::PaymentError;
use crate::i18n::Translator;
use crate::models::subscription::most_recent_entitled;
use crate::models::{
    AuthUser, PaymentMethod, Price, PriceInterval, Product, Subscription, SubscriptionStatus,
};
use crate::services::callables::{CheckoutRequest, ExtensionFunctions};
use crate::services::navigation::{paths, Navigator};
use crate::time_utils::format_long_date;
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;

/// Maximum concurrent price queries when loading the catalog.
const MAX_CONCURRENT_PRICE_LOADS: usize = 4;

/// Checkout mode for recurring plans.
const SUBSCRIPTION_MODE: &str = "subscription";

/// Currencies Stripe prices in whole units (no minor unit).
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

/// Format an amount in minor units, e.g. `199900, "usd"` → `$1,999.00` and
/// `1000, "jpy"` → `¥1,000`.
pub fn format_amount(minor_units: i64, currency: &str) -> String {
    let currency = currency.to_ascii_lowercase();
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    let value = if ZERO_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        group_thousands(abs)
    } else {
        format!("{}.{:02}", group_thousands(abs / 100), abs % 100)
    };
    match currency.as_str() {
        "usd" | "" => format!("{}${}", sign, value),
        "eur" => format!("{}€{}", sign, value),
        "gbp" => format!("{}£{}", sign, value),
        "jpy" => format!("{}¥{}", sign, value),
        other => format!("{}{} {}", sign, other.to_ascii_uppercase(), value),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Percent saved by paying yearly instead of monthly, rounded half-up.
pub fn yearly_savings_percent(monthly: &Price, yearly: &Price) -> Option<i64> {
    if monthly.unit_amount <= 0 {
        return None;
    }
    let savings = 100.0 - (yearly.unit_amount as f64 / 12.0) * 100.0 / monthly.unit_amount as f64;
    Some((savings + 0.5).floor() as i64)
}

/// One purchasable price of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanPrice {
    pub price_id: String,
    pub unit_amount: i64,
    pub currency: String,
    pub display: String,
    /// Button label: "Current Plan" or the subscribe call to action
    pub label: String,
}

/// Render model of one product on the pricing page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanView {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub monthly: Option<PlanPrice>,
    pub yearly: Option<PlanPrice>,
    pub savings_percent: Option<i64>,
    pub features: Vec<String>,
    pub is_current_plan: bool,
    pub subscribe_enabled: bool,
}

/// Render model of the active subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionSummary {
    pub id: String,
    pub status: SubscriptionStatus,
    pub product_name: Option<String>,
    pub price: Option<String>,
    pub period: Option<String>,
    pub cancel_at_period_end: bool,
}

impl SubscriptionSummary {
    pub fn from_subscription(subscription: &Subscription) -> Self {
        let period = subscription
            .current_period_start
            .as_ref()
            .and_then(|t| t.to_datetime())
            .zip(subscription.current_period_end.as_ref().and_then(|t| t.to_datetime()))
            .map(|(start, end)| format!("{} - {}", format_long_date(start), format_long_date(end)));

        Self {
            id: subscription.id.clone(),
            status: subscription.status,
            product_name: subscription
                .product
                .as_ref()
                .and_then(|p| p.expanded())
                .map(|p| p.name.clone()),
            price: subscription
                .price
                .as_ref()
                .and_then(|p| p.expanded())
                .map(|p| format_amount(p.unit_amount, &p.currency)),
            period,
            cancel_at_period_end: subscription.cancel_at_period_end,
        }
    }
}

/// Build pricing-page plans from catalog products.
///
/// A plan is the user's current plan when the user's active subscription
/// grants the same role the product's `firebaseRole` metadata names.
pub fn pricing_plans(
    products: &[Product],
    subscription_status: Option<SubscriptionStatus>,
    user: Option<&AuthUser>,
    translator: &Translator,
) -> Vec<PlanView> {
    let current_plan = translator.t("plans.currentPlan");

    products
        .iter()
        .map(|product| {
            let is_current_plan = match (user, subscription_status, product.firebase_role()) {
                (Some(user), Some(SubscriptionStatus::Active), Some(role)) => {
                    user.stripe_role.as_deref() == Some(role)
                }
                _ => false,
            };

            let plan_price = |interval: PriceInterval, cta_key: &str| {
                product.price_for(interval).map(|price| PlanPrice {
                    price_id: price.id.clone(),
                    unit_amount: price.unit_amount,
                    currency: price.currency.clone(),
                    display: format_amount(price.unit_amount, &price.currency),
                    label: if is_current_plan {
                        current_plan.clone()
                    } else {
                        translator.t(cta_key)
                    },
                })
            };

            let savings_percent = product
                .price_for(PriceInterval::Month)
                .zip(product.price_for(PriceInterval::Year))
                .and_then(|(monthly, yearly)| yearly_savings_percent(monthly, yearly));

            PlanView {
                product_id: product.id.clone(),
                name: product.name.clone(),
                description: product.description.clone(),
                monthly: plan_price(PriceInterval::Month, "plans.subscribeMonthly"),
                yearly: plan_price(PriceInterval::Year, "plans.subscribeYearly"),
                savings_percent,
                features: product.features().into_iter().map(str::to_string).collect(),
                is_current_plan,
                subscribe_enabled: !is_current_plan,
            }
        })
        .collect()
}

/// Subscription and catalog operations.
#[derive(Clone)]
pub struct BillingService {
    config: Config,
    db: PaymentsDb,
    functions: ExtensionFunctions,
    navigator: Arc<dyn Navigator>,
}

impl BillingService {
    pub fn new(
        config: Config,
        db: PaymentsDb,
        functions: ExtensionFunctions,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            db,
            functions,
            navigator,
        }
    }

    /// Active products with their active prices attached.
    pub async fn load_catalog(&self) -> Result<Vec<Product>, PaymentError> {
        let products: Vec<Product> = self
            .db
            .list_products()
            .await?
            .into_iter()
            .filter(|p| p.active)
            .collect();

        let db = &self.db;
        let catalog = stream::iter(products)
            .map(|mut product| async move {
                let prices = db.list_prices(&product.id).await?;
                product.prices = prices.into_iter().filter(|p| p.active).collect();
                Ok::<_, StoreError>(product)
            })
            .buffered(MAX_CONCURRENT_PRICE_LOADS)
            .collect::<Vec<Result<Product, StoreError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Product>, StoreError>>()?;

        tracing::debug!(products = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Start a subscription checkout for `price_id`.
    ///
    /// Without a user, navigates to login with a redirect back to pricing.
    pub async fn start_checkout(
        &self,
        user: Option<&AuthUser>,
        price_id: &str,
    ) -> Result<(), PaymentError> {
        let Some(user) = user else {
            self.navigator.assign(paths::LOGIN_FOR_PRICING);
            return Ok(());
        };

        let request = CheckoutRequest {
            price: price_id.to_string(),
            success_url: self.config.app_url(paths::ACCOUNT),
            cancel_url: self.config.app_url(paths::PRICING),
            mode: SUBSCRIPTION_MODE.to_string(),
            allow_promotion_codes: true,
        };

        let url = self
            .functions
            .create_checkout_session(user.id_token.as_deref(), &request)
            .await
            .map_err(|e| {
                tracing::error!(
                    uid = %user.uid,
                    price_id,
                    error = %e,
                    "Error creating checkout session"
                );
                PaymentError::from(e)
            })?;

        match url {
            Some(url) => {
                tracing::info!(uid = %user.uid, price_id, "Redirecting to checkout");
                self.navigator.assign(&url);
                Ok(())
            }
            None => {
                tracing::error!(
                    uid = %user.uid,
                    price_id,
                    "Failed to create checkout session: no URL returned"
                );
                Err(PaymentError::checkout_failed())
            }
        }
    }

    /// Open the customer portal for managing the subscription.
    pub async fn open_customer_portal(&self, user: Option<&AuthUser>) -> Result<(), PaymentError> {
        let Some(user) = user else {
            self.navigator.assign(paths::LOGIN_FOR_ACCOUNT);
            return Ok(());
        };

        let return_url = self.config.app_url(paths::ACCOUNT);
        let url = self
            .functions
            .create_portal_link(user.id_token.as_deref(), &return_url)
            .await?
            .ok_or_else(PaymentError::portal_failed)?;

        self.navigator.assign(&url);
        Ok(())
    }

    /// Mirror a user's payment methods; the handle stops the listener.
    pub async fn watch_payment_methods<F>(
        &self,
        uid: &str,
        on_change: F,
    ) -> Result<ListenerHandle, PaymentError>
    where
        F: Fn(Vec<PaymentMethod>) + Send + Sync + 'static,
    {
        Ok(self.db.watch_payment_methods(uid, on_change).await?)
    }

    /// Mirror the user's most recent active or trialing subscription.
    pub async fn watch_active_subscription<F>(
        &self,
        uid: &str,
        on_change: F,
    ) -> Result<ListenerHandle, PaymentError>
    where
        F: Fn(Option<Subscription>) + Send + Sync + 'static,
    {
        Ok(self
            .db
            .watch_subscriptions(uid, move |subscriptions| {
                on_change(most_recent_entitled(&subscriptions).cloned())
            })
            .await?)
    }
}
