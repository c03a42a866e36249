// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use quickhire_payments::db::StoreError;
use quickhire_payments::error::{ErrorCode, PaymentError};

#[test]
fn test_own_codes_round_trip() {
    let errors = [
        PaymentError::not_authenticated(),
        PaymentError::incomplete_profile(),
        PaymentError::missing_email(),
        PaymentError::invalid_email(),
        PaymentError::permission_denied(),
        PaymentError::customer_creation_failed(),
        PaymentError::api_error(),
        PaymentError::setup_failed(),
        PaymentError::portal_failed(),
        PaymentError::checkout_failed(),
    ];

    for err in errors {
        assert!(err.code.is_own());
        assert!(err.code_str().starts_with("stripe/"));
        assert_eq!(ErrorCode::from(err.code_str()), err.code);
        assert!(!err.message.is_empty());
    }
}

#[test]
fn test_foreign_codes_pass_through() {
    let code = ErrorCode::from("resource-exhausted");
    assert_eq!(code, ErrorCode::Other("resource-exhausted".to_string()));
    assert!(!code.is_own());
    assert_eq!(code.to_string(), "resource-exhausted");
}

#[test]
fn test_store_errors_keep_firestore_code() {
    let err: PaymentError = StoreError::NotFound("users/u1".to_string()).into();
    assert_eq!(err.code_str(), "not-found");
    assert_eq!(err.to_string(), "Document not found: users/u1");

    let err: PaymentError = StoreError::PermissionDenied("customers/u1".to_string()).into();
    assert_eq!(err.code_str(), "permission-denied");
}
