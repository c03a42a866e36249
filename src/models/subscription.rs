//! Subscription mirrored from `customers/{uid}/subscriptions`.

use crate::models::product::{Price, Product};
use crate::time_utils::FirestoreTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stripe subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Active and trialing subscriptions grant access.
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

/// A field that is either an expanded object or a document reference path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linked<T> {
    Expanded(T),
    Reference(String),
}

impl<T> Linked<T> {
    pub fn expanded(&self) -> Option<&T> {
        match self {
            Linked::Expanded(value) => Some(value),
            Linked::Reference(_) => None,
        }
    }
}

/// Subscription document written by the Stripe extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: String,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub current_period_start: Option<FirestoreTime>,
    #[serde(default)]
    pub current_period_end: Option<FirestoreTime>,
    #[serde(default)]
    pub created: Option<FirestoreTime>,
    #[serde(default)]
    pub canceled_at: Option<FirestoreTime>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub price: Option<Linked<Price>>,
    #[serde(default)]
    pub product: Option<Linked<Product>>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Subscription {
    /// Creation time in unix seconds, 0 when unknown (sorts oldest).
    pub fn created_seconds(&self) -> i64 {
        self.created
            .as_ref()
            .and_then(FirestoreTime::to_datetime)
            .map(|dt| dt.timestamp())
            .unwrap_or(0)
    }
}

/// Pick the most recently created active or trialing subscription.
pub fn most_recent_entitled(subscriptions: &[Subscription]) -> Option<&Subscription> {
    subscriptions
        .iter()
        .filter(|s| s.status.is_entitled())
        .max_by_key(|s| s.created_seconds())
}
