// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decides whether a payment failure warrants an automatic customer repair.
//!
//! Most failures right after sign-up come from the provider customer not
//! existing yet. Re-running customer-ensure once fixes those; it cannot fix
//! permission problems or profile data the user has to correct.

use crate::error::PaymentError;

/// Message fragments meaning the provider customer is missing or incomplete.
const CUSTOMER_MESSAGES: &[&str] = &[
    "incomplete",
    "not found",
    "no such customer",
    "customer not found",
    "payment profile",
    "stripe customer id not found",
    "resource-exhausted",
];

/// Message fragments pointing at the user profile.
const PROFILE_MESSAGES: &[&str] = &["user profile", "profile is incomplete", "profile setup"];

/// Message fragments pointing at a missing email.
const EMAIL_MESSAGES: &[&str] = &[
    "email is required",
    "email address is required",
    "missing email",
];

/// Message fragments of authorization failures.
const PERMISSION_MESSAGES: &[&str] = &["permission denied", "not authorized", "unauthorized"];

/// Codes for which a repair attempt is worthwhile.
pub const RECOVERABLE_CODES: &[&str] = &[
    "stripe/customer-not-found",
    "stripe/setup-failed",
    "not-found",
    "failed-precondition",
    "resource-exhausted",
    "400",
];

/// Codes that never trigger a repair.
pub const NON_RECOVERABLE_CODES: &[&str] = &[
    "permission-denied",
    "unauthenticated",
    "auth/not-authenticated",
    "stripe/permission-denied",
    "stripe/not-authenticated",
];

/// Validation failures raised by customer-ensure. Alongside a profile or
/// email message the user must act; otherwise they count as recoverable.
pub const USER_ACTION_CODES: &[&str] = &["stripe/incomplete-profile", "stripe/missing-email"];

fn contains_any(message: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| message.contains(needle))
}

/// Should an automatic "ensure customer" attempt precede surfacing this error?
///
/// `message` is matched case-insensitively.
pub fn should_attempt_recovery(message: &str, code: Option<&str>) -> bool {
    let message = message.to_lowercase();
    let code = code.map(str::trim).unwrap_or_default();

    if contains_any(&message, PERMISSION_MESSAGES) || NON_RECOVERABLE_CODES.contains(&code) {
        return false;
    }

    if contains_any(&message, PROFILE_MESSAGES) || contains_any(&message, EMAIL_MESSAGES) {
        return !USER_ACTION_CODES.contains(&code);
    }

    contains_any(&message, CUSTOMER_MESSAGES)
        || RECOVERABLE_CODES.contains(&code)
        || USER_ACTION_CODES.contains(&code)
}

/// [`should_attempt_recovery`] applied to a [`PaymentError`].
pub fn is_recoverable(error: &PaymentError) -> bool {
    should_attempt_recovery(&error.message, Some(error.code_str()))
}
