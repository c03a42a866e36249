// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod logs;
pub mod payment_method;
pub mod product;
pub mod subscription;
pub mod user;

pub use logs::{PaymentAttemptLog, RecoveryLog, RecoveryStatus};
pub use payment_method::{CardDetails, PaymentMethod};
pub use product::{Price, PriceInterval, PriceType, Product};
pub use subscription::{Subscription, SubscriptionStatus};
pub use user::{AuthUser, CustomerRecord, UserProfile};
