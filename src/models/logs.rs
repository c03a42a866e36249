//! Diagnostic log documents under `users/{uid}/logs/*`.
//!
//! These are written merge-only as a trail for support; nothing reads them
//! back to drive behavior except the attempt counters.

use serde::{Deserialize, Serialize};

/// Lifecycle of a customer-recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    Started,
    Completed,
    Failed,
}

/// `users/{uid}/logs/stripe_recovery`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryLog {
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_attempt_at: Option<String>,
    #[serde(default)]
    pub triggered_from: Option<String>,
    pub status: RecoveryStatus,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub failed_at: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// `users/{uid}/logs/payment_attempts`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttemptLog {
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_attempt_at: Option<String>,
    #[serde(rename = "type")]
    pub attempt_type: String,
    pub status: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}
