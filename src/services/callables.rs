// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase callable functions client.
//!
//! Handles:
//! - The callable HTTP protocol (`{"data": …}` in, `{"result": …}` out)
//! - Bearer ID-token authentication
//! - Mapping callable error statuses to Firestore-style codes
//!
//! [`ExtensionFunctions`] wraps the generic invoker with the typed calls the
//! payment layer makes into the Stripe extension.

use crate::config::Config;
use crate::error::PaymentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Callable names owned by the Stripe extension and the app backend.
pub mod names {
    pub const CREATE_PORTAL_LINK: &str = "ext-firestore-stripe-payments-createPortalLink";
    pub const CREATE_CHECKOUT_SESSION: &str = "ext-firestore-stripe-payments-createCheckoutSession";
    pub const CREATE_CUSTOMER: &str = "ext-firestore-stripe-payments-createCustomer";
    pub const PROCESS_JOB_ACCEPTANCE: &str = "processJobAcceptance";
}

/// Failure of a callable function.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CallableError {
    /// Lower-case, dash-separated status (e.g. `not-found`), or the HTTP
    /// status code when the function returned no structured error.
    pub code: String,
    pub message: String,
}

impl CallableError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<CallableError> for PaymentError {
    fn from(e: CallableError) -> Self {
        PaymentError::new(e.message, e.code.as_str().into())
    }
}

/// Invokes a named callable function.
#[async_trait]
pub trait CallableInvoker: Send + Sync {
    async fn call(
        &self,
        name: &str,
        data: Value,
        id_token: Option<&str>,
    ) -> Result<Value, CallableError>;
}

/// Callable error payload.
#[derive(Debug, Deserialize)]
struct CallableErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallableResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<CallableErrorBody>,
}

/// Convert a canonical status (`NOT_FOUND`) into a code (`not-found`).
fn status_to_code(status: &str) -> String {
    status.to_ascii_lowercase().replace('_', "-")
}

/// HTTP implementation of [`CallableInvoker`].
#[derive(Clone)]
pub struct HttpCallables {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCallables {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.callable_base_url())
    }
}

#[async_trait]
impl CallableInvoker for HttpCallables {
    async fn call(
        &self,
        name: &str,
        data: Value,
        id_token: Option<&str>,
    ) -> Result<Value, CallableError> {
        let url = format!("{}/{}", self.base_url, name);

        let mut request = self.http.post(&url).json(&serde_json::json!({ "data": data }));
        if let Some(token) = id_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| {
                CallableError::new("unavailable", format!("{} request failed: {}", name, e))
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<CallableResponse> = serde_json::from_str(&body).ok();

        if let Some(CallableResponse {
            error: Some(err), ..
        }) = &parsed
        {
            let code = err
                .status
                .as_deref()
                .map(status_to_code)
                .unwrap_or_else(|| status.as_u16().to_string());
            let message = err.message.clone().unwrap_or_else(|| code.clone());
            tracing::warn!(
                function = name,
                code = %code,
                message = %message,
                "Callable returned error"
            );
            return Err(CallableError::new(code, message));
        }

        if !status.is_success() {
            tracing::warn!(function = name, status = %status, "Callable HTTP failure");
            return Err(CallableError::new(
                status.as_u16().to_string(),
                format!("HTTP {}: {}", status, body),
            ));
        }

        match parsed {
            Some(CallableResponse {
                result: Some(result),
                ..
            })
            | Some(CallableResponse {
                data: Some(result), ..
            }) => Ok(result),
            _ => Err(CallableError::new(
                "internal",
                format!("{} returned a response without a result", name),
            )),
        }
    }
}

/// Checkout session parameters for `createCheckoutSession`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub price: String,
    pub success_url: String,
    pub cancel_url: String,
    pub mode: String,
    pub allow_promotion_codes: bool,
}

#[derive(Debug, Deserialize)]
struct UrlResult {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerResult {
    customer_id: String,
}

/// Result of the job-acceptance payment function.
#[derive(Debug, Clone, Deserialize)]
pub struct JobAcceptanceResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn decode<T: for<'de> Deserialize<'de>>(name: &str, value: Value) -> Result<T, CallableError> {
    serde_json::from_value(value).map_err(|e| {
        CallableError::new("internal", format!("{} returned malformed data: {}", name, e))
    })
}

/// Typed calls into the Stripe extension.
#[derive(Clone)]
pub struct ExtensionFunctions {
    invoker: Arc<dyn CallableInvoker>,
}

impl ExtensionFunctions {
    pub fn new(invoker: Arc<dyn CallableInvoker>) -> Self {
        Self { invoker }
    }

    /// Get a customer-portal URL that returns to `return_url`.
    pub async fn create_portal_link(
        &self,
        id_token: Option<&str>,
        return_url: &str,
    ) -> Result<Option<String>, CallableError> {
        let value = self
            .invoker
            .call(
                names::CREATE_PORTAL_LINK,
                serde_json::json!({ "return_url": return_url }),
                id_token,
            )
            .await?;
        Ok(decode::<UrlResult>(names::CREATE_PORTAL_LINK, value)?.url)
    }

    /// Create a checkout session and return its hosted URL.
    pub async fn create_checkout_session(
        &self,
        id_token: Option<&str>,
        request: &CheckoutRequest,
    ) -> Result<Option<String>, CallableError> {
        let data = serde_json::to_value(request)
            .map_err(|e| CallableError::new("invalid-argument", e.to_string()))?;
        let value = self
            .invoker
            .call(names::CREATE_CHECKOUT_SESSION, data, id_token)
            .await?;
        Ok(decode::<UrlResult>(names::CREATE_CHECKOUT_SESSION, value)?.url)
    }

    /// Create (or fetch) the provider customer for the calling user.
    pub async fn create_customer(
        &self,
        id_token: Option<&str>,
        email: &str,
        name: &str,
    ) -> Result<String, CallableError> {
        let value = self
            .invoker
            .call(
                names::CREATE_CUSTOMER,
                serde_json::json!({ "email": email, "name": name }),
                id_token,
            )
            .await?;
        Ok(decode::<CustomerResult>(names::CREATE_CUSTOMER, value)?.customer_id)
    }

    pub async fn process_job_acceptance(
        &self,
        id_token: Option<&str>,
        application_id: &str,
        job_id: &str,
    ) -> Result<JobAcceptanceResult, CallableError> {
        let value = self
            .invoker
            .call(
                names::PROCESS_JOB_ACCEPTANCE,
                serde_json::json!({ "applicationId": application_id, "jobId": job_id }),
                id_token,
            )
            .await?;
        decode(names::PROCESS_JOB_ACCEPTANCE, value)
    }
}
