//! Typed page configuration for the booking checkout.
//!
//! The server renders this as JSON into a `<script type="application/json">`
//! element (Django's `json_script`), e.g.
//!
//! ```html
//! <script id="checkout-config" type="application/json">
//!   {"stripe_public_key": "pk_test_...", "client_secret": "pi_..._secret_...",
//!    "contact": {"email": "ana@example.com", "phone": "+63 917 000 0000"}}
//! </script>
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::CheckoutError;
use crate::payment_method::PaymentMethodChoice;

/// Everything the checkout needs from the server-rendered page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CheckoutConfig {
    /// Stripe publishable key (`pk_...`).
    pub stripe_public_key: String,

    /// Client secret of the booking's PaymentIntent.
    pub client_secret: String,

    /// Forward billing details to `confirmCardPayment`.
    #[serde(default = "default_forward_billing")]
    pub billing_details: bool,

    /// Contact details of the lead passenger, used as billing details.
    #[serde(default)]
    pub contact: ContactDetails,

    /// Method selected when the page loads.
    #[serde(default)]
    pub default_method: PaymentMethodChoice,

    /// Stripe Elements `style` object for the card input.
    #[serde(default = "default_card_style")]
    pub card_style: JsonValue,
}

/// Lead passenger contact details.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ContactDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `payment_method.billing_details` as Stripe.js expects it.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct BillingDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn default_forward_billing() -> bool {
    true
}

/// Style used on the booking site's card input.
pub fn default_card_style() -> JsonValue {
    json!({
        "base": {
            "color": "#000",
            "fontFamily": "\"Helvetica Neue\", Helvetica, sans-serif",
            "fontSmoothing": "antialiased",
            "fontSize": "16px",
            "::placeholder": { "color": "#aab7c4" }
        },
        "invalid": {
            "color": "#dc3545",
            "iconColor": "#dc3545"
        }
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CheckoutConfig {
    pub fn new(stripe_public_key: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            stripe_public_key: stripe_public_key.into(),
            client_secret: client_secret.into(),
            billing_details: default_forward_billing(),
            contact: ContactDetails::default(),
            default_method: PaymentMethodChoice::default(),
            card_style: default_card_style(),
        }
    }

    /// Parse a configuration from its JSON form.
    pub fn from_json(raw: &str) -> Result<Self, CheckoutError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read the configuration embedded in the element with id `element_id`.
    pub fn from_json_script(element_id: &str) -> Result<Self, CheckoutError> {
        let document = web_sys::window()
            .and_then(|win| win.document())
            .ok_or(CheckoutError::NoDocument)?;
        let raw = document
            .get_element_by_id(element_id)
            .and_then(|el| el.text_content())
            .ok_or_else(|| CheckoutError::MissingElement(element_id.to_string()))?;
        Self::from_json(&raw)
    }

    /// Billing details for a confirmation, or `None` when forwarding is off.
    pub fn billing_for(&self, cardholder_name: &str) -> Option<BillingDetails> {
        if !self.billing_details {
            return None;
        }
        Some(BillingDetails {
            name: non_blank(Some(cardholder_name)),
            phone: non_blank(self.contact.phone.as_deref()),
            email: non_blank(self.contact.email.as_deref()),
        })
    }
}
