//! Payment method mirrored from `customers/{uid}/payment_methods`.

use serde::{Deserialize, Serialize};

/// Card details of a payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    #[serde(default = "unknown_brand")]
    pub brand: String,
    #[serde(default = "masked_last4")]
    pub last4: String,
    #[serde(default)]
    pub exp_month: u32,
    #[serde(default)]
    pub exp_year: u32,
}

fn unknown_brand() -> String {
    "unknown".to_string()
}

fn masked_last4() -> String {
    "****".to_string()
}

fn card_type() -> String {
    "card".to_string()
}

impl Default for CardDetails {
    fn default() -> Self {
        Self {
            brand: unknown_brand(),
            last4: masked_last4(),
            exp_month: 0,
            exp_year: 0,
        }
    }
}

/// Payment method document written by the Stripe extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    /// Document ID (provider payment method ID)
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "card_type")]
    pub method_type: String,
    #[serde(default)]
    pub card: CardDetails,
    #[serde(default)]
    pub is_default: bool,
}
