//! Error types for checkout setup and for errors reported by Stripe.js.

use serde::Deserialize;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Shown when Stripe reports an error outside the recognized categories.
pub const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Representation of a Stripe.js error object.
#[derive(Clone, Debug, Deserialize, Error, PartialEq)]
#[error("{message}")]
pub struct StripeError {
    /// Human-readable message.
    pub message: String,
    /// Stripe’s error type, e.g. `"card_error"`.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Optional Stripe error code, e.g. `"card_declined"`.
    #[serde(default)]
    pub code: Option<String>,
}

/// Error categories the page is allowed to show verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The card was declined or is otherwise unusable.
    Card,
    /// The card details failed client-side validation.
    Validation,
    /// Anything else (api errors, rate limits, network trouble, ...).
    Other,
}

impl StripeError {
    /// Build an error that did not come from Stripe itself.
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            code: None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.error_type.as_deref() {
            Some("card_error") => ErrorCategory::Card,
            Some("validation_error") => ErrorCategory::Validation,
            _ => ErrorCategory::Other,
        }
    }

    /// The message to put in front of the customer.
    ///
    /// Raw text from unrecognized categories is never shown.
    pub fn display_message(&self) -> String {
        match self.category() {
            ErrorCategory::Card | ErrorCategory::Validation => self.message.clone(),
            ErrorCategory::Other => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Convert any caught `JsValue` into a `StripeError` with best effort.
pub(crate) fn js_to_stripe_error(value: JsValue) -> StripeError {
    serde_wasm_bindgen::from_value::<StripeError>(value.clone())
        .unwrap_or_else(|_| StripeError::local(value.as_string().unwrap_or_else(|| format!("{:?}", value))))
}

/// Failures while wiring the checkout into the page.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No `window`/`document` is available.
    #[error("browser document is not available")]
    NoDocument,
    /// The configuration element is missing from the page.
    #[error("element `#{0}` not found")]
    MissingElement(String),
    /// The embedded configuration could not be parsed.
    #[error("invalid checkout configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}
