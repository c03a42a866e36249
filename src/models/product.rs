//! Products and prices synced by the Stripe extension (`products/{id}/prices`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key holding the custom-claim role granted by a product.
pub const FIREBASE_ROLE_KEY: &str = "firebaseRole";

/// Billing interval of a recurring price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceInterval {
    Day,
    Week,
    Month,
    Year,
}

/// Whether a price is charged once or on a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    #[serde(alias = "one-time")]
    OneTime,
    #[default]
    Recurring,
}

/// A price document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Amount in the currency's minor unit (cents)
    #[serde(default)]
    pub unit_amount: i64,
    #[serde(default)]
    pub interval: Option<PriceInterval>,
    #[serde(default)]
    pub interval_count: Option<u32>,
    #[serde(rename = "type", default)]
    pub price_type: PriceType,
}

fn default_currency() -> String {
    "usd".to_string()
}

/// A product document with its active prices attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub prices: Vec<Price>,
}

impl Product {
    /// Role granted by this product, if any.
    pub fn firebase_role(&self) -> Option<&str> {
        self.metadata
            .get(FIREBASE_ROLE_KEY)
            .map(String::as_str)
            .filter(|r| !r.is_empty())
    }

    /// Feature bullet points: every metadata value except the role.
    pub fn features(&self) -> Vec<&str> {
        self.metadata
            .iter()
            .filter(|(key, _)| key.as_str() != FIREBASE_ROLE_KEY)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn price_for(&self, interval: PriceInterval) -> Option<&Price> {
        self.prices.iter().find(|p| p.interval == Some(interval))
    }
}
