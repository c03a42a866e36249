//! Browser-navigation side effects.
//!
//! Leaving the app for the provider's hosted portal or checkout is the only
//! way payment methods change. The embedding front end supplies the real
//! [`Navigator`]; pages read the result back through [`ReturnStatus`].

use std::borrow::Cow;

/// Performs a full-page navigation.
pub trait Navigator: Send + Sync {
    fn assign(&self, url: &str);
}

/// Navigator that only logs; used by the diagnostic binary.
#[derive(Debug, Default, Clone)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn assign(&self, url: &str) {
        tracing::info!(url = %url, "Navigation requested");
    }
}

/// Paths inside the app used as return targets.
pub mod paths {
    pub const ACCOUNT: &str = "/account";
    pub const ACCOUNT_SETUP_COMPLETE: &str = "/account?setup=complete";
    pub const PRICING: &str = "/pricing";
    pub const LOGIN_FOR_PRICING: &str = "/login?redirect=pricing";
    pub const LOGIN_FOR_ACCOUNT: &str = "/login?redirect=account";
}

/// Query parameters the app appends to provider return URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnStatus {
    /// `setup=complete` after adding a payment method
    pub setup: Option<String>,
    /// `payment=success` / `payment=cancelled` after checkout
    pub payment: Option<String>,
    /// Post-login redirect target
    pub redirect: Option<String>,
}

impl ReturnStatus {
    /// Parse a query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let mut status = ReturnStatus::default();
        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(Cow::into_owned)
                .unwrap_or_else(|_| value.to_string());
            match key {
                "setup" => status.setup = Some(value),
                "payment" => status.payment = Some(value),
                "redirect" => status.redirect = Some(value),
                _ => {}
            }
        }
        status
    }

    /// Parse the query part of a full URL.
    pub fn from_url(url: &str) -> Self {
        match url.split_once('?') {
            Some((_, query)) => Self::from_query(query.split('#').next().unwrap_or_default()),
            None => Self::default(),
        }
    }

    pub fn setup_complete(&self) -> bool {
        self.setup.as_deref() == Some("complete")
    }

    pub fn payment_succeeded(&self) -> bool {
        self.payment.as_deref() == Some("success")
    }
}
