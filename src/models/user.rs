//! User profile and customer record models.

use serde::{Deserialize, Serialize};

/// User profile stored at `users/{uid}`.
///
/// Only the fields the payment layer reads are modelled; other profile
/// fields written by the rest of the app are ignored on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Email address (required for creating a payment customer)
    #[serde(default)]
    pub email: Option<String>,
    /// Full name as entered at registration
    #[serde(default)]
    pub full_name: Option<String>,
    /// Display name from the auth provider
    #[serde(default)]
    pub display_name: Option<String>,
    /// Provider customer ID, once ensured
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
}

impl UserProfile {
    /// Name sent to the provider: full name, then display name, then empty.
    pub fn customer_name(&self) -> String {
        self.full_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.display_name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string()
    }

    /// Email, treating an empty string as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Customer record stored at `customers/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub customer_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The authenticated user of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    /// Role claim set by the Stripe extension from `metadata.firebaseRole`
    pub stripe_role: Option<String>,
    /// Firebase ID token presented to callable functions
    pub id_token: Option<String>,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            stripe_role: None,
            id_token: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_stripe_role(mut self, role: impl Into<String>) -> Self {
        self.stripe_role = Some(role.into());
        self
    }

    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }
}
