// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment error type shared by every operation in the crate.
//!
//! Every failure surfaces as a [`PaymentError`]: a user-facing message plus a
//! string code. Codes raised by this crate live under the `stripe/` prefix;
//! codes coming from Firestore or the callable functions are carried through
//! verbatim as [`ErrorCode::Other`] so the recovery heuristic can inspect them.

use std::fmt;

/// Error codes understood by the payment layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    NotAuthenticated,
    IncompleteProfile,
    MissingEmail,
    InvalidEmail,
    PermissionDenied,
    CustomerCreationFailed,
    ApiError,
    SetupFailed,
    PortalFailed,
    PaymentFailed,
    CheckoutFailed,
    InvalidUser,
    /// A code reported by an upstream service (e.g. `not-found`, `400`).
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::NotAuthenticated => "stripe/not-authenticated",
            ErrorCode::IncompleteProfile => "stripe/incomplete-profile",
            ErrorCode::MissingEmail => "stripe/missing-email",
            ErrorCode::InvalidEmail => "stripe/invalid-email",
            ErrorCode::PermissionDenied => "stripe/permission-denied",
            ErrorCode::CustomerCreationFailed => "stripe/customer-creation-failed",
            ErrorCode::ApiError => "stripe/api-error",
            ErrorCode::SetupFailed => "stripe/setup-failed",
            ErrorCode::PortalFailed => "stripe/portal-failed",
            ErrorCode::PaymentFailed => "stripe/payment-failed",
            ErrorCode::CheckoutFailed => "stripe/checkout-failed",
            ErrorCode::InvalidUser => "stripe/invalid-user",
            ErrorCode::Other(code) => code,
        }
    }

    /// Whether this code was raised by the payment layer itself rather than
    /// passed through from an upstream service.
    pub fn is_own(&self) -> bool {
        !matches!(self, ErrorCode::Other(_))
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "stripe/not-authenticated" => ErrorCode::NotAuthenticated,
            "stripe/incomplete-profile" => ErrorCode::IncompleteProfile,
            "stripe/missing-email" => ErrorCode::MissingEmail,
            "stripe/invalid-email" => ErrorCode::InvalidEmail,
            "stripe/permission-denied" => ErrorCode::PermissionDenied,
            "stripe/customer-creation-failed" => ErrorCode::CustomerCreationFailed,
            "stripe/api-error" => ErrorCode::ApiError,
            "stripe/setup-failed" => ErrorCode::SetupFailed,
            "stripe/portal-failed" => ErrorCode::PortalFailed,
            "stripe/payment-failed" => ErrorCode::PaymentFailed,
            "stripe/checkout-failed" => ErrorCode::CheckoutFailed,
            "stripe/invalid-user" => ErrorCode::InvalidUser,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment failure: user-facing message plus code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PaymentError {
    pub message: String,
    pub code: ErrorCode,
}

impl PaymentError {
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn not_authenticated() -> Self {
        Self::new(
            "You must be logged in to use payment features.",
            ErrorCode::NotAuthenticated,
        )
    }

    pub fn incomplete_profile() -> Self {
        Self::new(
            "Your user profile is incomplete. Please complete your profile setup to access payment features.",
            ErrorCode::IncompleteProfile,
        )
    }

    pub fn missing_email() -> Self {
        Self::new(
            "An email address is required for payment setup. Please update your profile with an email address.",
            ErrorCode::MissingEmail,
        )
    }

    pub fn invalid_email() -> Self {
        Self::new(
            "Your email is missing or invalid. Please update your profile with a valid email address.",
            ErrorCode::InvalidEmail,
        )
    }

    pub fn permission_denied() -> Self {
        Self::new(
            "You do not have permission to access payment features.",
            ErrorCode::PermissionDenied,
        )
    }

    pub fn customer_creation_failed() -> Self {
        Self::new(
            "Unable to set up your payment profile. Please try again later.",
            ErrorCode::CustomerCreationFailed,
        )
    }

    pub fn api_error() -> Self {
        Self::new(
            "There was an issue with the payment service. Please try again later.",
            ErrorCode::ApiError,
        )
    }

    pub fn setup_failed() -> Self {
        Self::new(
            "Failed to set up payment method. Please try again.",
            ErrorCode::SetupFailed,
        )
    }

    pub fn portal_failed() -> Self {
        Self::new(
            "Failed to start payment method management. Please try again.",
            ErrorCode::PortalFailed,
        )
    }

    pub fn checkout_failed() -> Self {
        Self::new(
            "Failed to start checkout. Please try again.",
            ErrorCode::CheckoutFailed,
        )
    }

    pub fn code_str(&self) -> &str {
        self.code.as_str()
    }
}

/// Result type alias for payment operations
pub type Result<T> = std::result::Result<T, PaymentError>;
