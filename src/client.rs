//! booking_checkout/src/client.rs
//!
//! High-level Rust API over the Stripe.js Card Element.
//!
//! This module provides:
//! - `load_stripe()` to create the Stripe.js client from the publishable key.
//! - `mount_card_element()` to create and mount the card input, returning a `CardWidget`.
//! - `CardWidget` to listen for validation changes, enable/disable and unmount the input.
//! - `StripeGateway`, the `PaymentGateway` used in the browser: `confirmCardPayment`
//!   followed, when Stripe asks for it, by `handleCardAction`.
//!
//! # Example Usage
//! ```rust,ignore
//! let stripe = load_stripe(&config.stripe_public_key)?;
//! let mut card = mount_card_element(&stripe, "#card-element", &config.card_style)?;
//! card.on_change(|event| tracing::debug!("card complete: {}", event.complete))?;
//!
//! let card_slot = Rc::new(RefCell::new(Some(card)));
//! let gateway = StripeGateway::new(Rc::new(RefCell::new(Some(stripe))), card_slot);
//! match gateway.confirm_card_payment(&config.client_secret, None).await {
//!     Ok(intent) => tracing::info!("{} is {}", intent.id, intent.status),
//!     Err(err)   => tracing::error!("Error: {}", err.message),
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use gloo_utils::format::JsValueSerdeExt;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use wasm_bindgen::prelude::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::js_sys::{Object, Promise, Reflect};

use crate::bindings::{new_stripe, JsCardElement, JsElements, JsStripe};
use crate::config::BillingDetails;
use crate::error::{js_to_stripe_error, StripeError};
use crate::orchestrator::{GatewayResult, PaymentGateway, PaymentIntent};

/// Payload of the card input's `change` event.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CardChangeEvent {
    #[serde(default)]
    pub error: Option<CardInputError>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub empty: bool,
}

/// Live validation error raised by the card input.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CardInputError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// A mounted Card Element.
///
/// Dropping the widget drops its `change` listener; call
/// [`CardWidget::unmount`] to also remove the iframe from the page.
#[derive(Debug)]
pub struct CardWidget {
    #[allow(dead_code)]
    elements: JsElements,
    card: JsCardElement,
    on_change: Option<Closure<dyn FnMut(JsValue)>>,
}

/// Create the Stripe.js client. Stripe.js must already be loaded
/// (see [`crate::use_stripejs`]).
pub fn load_stripe(publishable_key: &str) -> Result<JsStripe, StripeError> {
    new_stripe(publishable_key).map_err(js_to_stripe_error)
}

/// Create a Card Element styled with `style` and mount it into `mount_selector`.
///
/// # Arguments
///
/// * `stripe` – The client from [`load_stripe`].
/// * `mount_selector` – CSS selector of the container, e.g. `"#card-element"`.
/// * `style` – Stripe Elements `style` object.
pub fn mount_card_element(
    stripe: &JsStripe,
    mount_selector: &str,
    style: &JsonValue,
) -> Result<CardWidget, StripeError> {
    let elements = stripe.elements().map_err(js_to_stripe_error)?;

    let options = to_js(&json!({ "style": style }))?;
    let card = elements
        .create_element("card", options)
        .map_err(js_to_stripe_error)?;

    card.mount(mount_selector).map_err(js_to_stripe_error)?;
    tracing::debug!("card input mounted into {mount_selector}");

    Ok(CardWidget {
        elements,
        card,
        on_change: None,
    })
}

impl CardWidget {
    /// Call `handler` on every `change` event of the card input.
    /// Replaces any earlier handler.
    pub fn on_change<F>(&mut self, mut handler: F) -> Result<(), StripeError>
    where
        F: FnMut(CardChangeEvent) + 'static,
    {
        let closure = Closure::wrap(Box::new(move |event: JsValue| {
            match serde_wasm_bindgen::from_value::<CardChangeEvent>(event) {
                Ok(event) => handler(event),
                Err(err) => tracing::warn!("unreadable card change event: {err}"),
            }
        }) as Box<dyn FnMut(JsValue)>);

        self.card
            .on("change", closure.as_ref().unchecked_ref())
            .map_err(js_to_stripe_error)?;
        self.on_change = Some(closure);
        Ok(())
    }

    /// `card.update({ disabled })`
    pub fn set_disabled(&self, disabled: bool) -> Result<(), StripeError> {
        let options = to_js(&json!({ "disabled": disabled }))?;
        self.card.update(options).map_err(js_to_stripe_error)
    }

    /// Remove the card input from the page.
    pub fn unmount(self) -> Result<(), StripeError> {
        self.card.unmount().map_err(js_to_stripe_error)
    }

    pub fn element(&self) -> &JsCardElement {
        &self.card
    }
}

/// Slot holding the card input while the card method is selected.
pub type CardSlot = Rc<RefCell<Option<CardWidget>>>;

/// Slot filled with the Stripe.js client once the script has loaded.
pub type StripeSlot = Rc<RefCell<Option<JsStripe>>>;

/// [`PaymentGateway`] backed by Stripe.js.
///
/// Both slots may still be empty when the gateway is built; calls made
/// before Stripe.js has loaded fail with a local [`StripeError`].
#[derive(Debug, Clone)]
pub struct StripeGateway {
    stripe: StripeSlot,
    card: CardSlot,
}

impl StripeGateway {
    pub fn new(stripe: StripeSlot, card: CardSlot) -> Self {
        Self { stripe, card }
    }

    fn loaded_stripe(&self) -> Result<JsStripe, StripeError> {
        self.stripe
            .borrow()
            .clone()
            .ok_or_else(|| StripeError::local("Stripe.js is not loaded"))
    }

    fn mounted_card(&self) -> Result<JsCardElement, StripeError> {
        self.card
            .borrow()
            .as_ref()
            .map(|widget| widget.element().clone())
            .ok_or_else(|| StripeError::local("card input is not mounted"))
    }
}

impl PaymentGateway for StripeGateway {
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        billing: Option<&BillingDetails>,
    ) -> GatewayResult {
        let stripe = self.loaded_stripe()?;
        let card = self.mounted_card()?;

        // { payment_method: { card, billing_details } }
        let payment_method = Object::new();
        Reflect::set(&payment_method, &JsValue::from_str("card"), card.as_ref())
            .map_err(js_to_stripe_error)?;
        if let Some(billing) = billing {
            Reflect::set(
                &payment_method,
                &JsValue::from_str("billing_details"),
                &to_js(billing)?,
            )
            .map_err(js_to_stripe_error)?;
        }
        let data = Object::new();
        Reflect::set(&data, &JsValue::from_str("payment_method"), &payment_method)
            .map_err(js_to_stripe_error)?;

        let promise = stripe
            .confirm_card_payment(client_secret, data.into())
            .map_err(js_to_stripe_error)?;
        await_intent(promise).await
    }

    async fn handle_card_action(&self, client_secret: &str) -> GatewayResult {
        let promise = self
            .loaded_stripe()?
            .handle_card_action(client_secret)
            .map_err(js_to_stripe_error)?;
        await_intent(promise).await
    }
}

/// Await a Stripe.js promise resolving to `{ paymentIntent }` or `{ error }`.
async fn await_intent(promise: Promise) -> GatewayResult {
    let result = JsFuture::from(promise).await.map_err(js_to_stripe_error)?;

    let error = Reflect::get(&result, &JsValue::from_str("error"))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null());
    if let Some(error) = error {
        return Err(js_to_stripe_error(error));
    }

    let intent = Reflect::get(&result, &JsValue::from_str("paymentIntent"))
        .map_err(js_to_stripe_error)?;
    intent
        .into_serde::<PaymentIntent>()
        .map_err(|err| StripeError::local(format!("unreadable paymentIntent: {err}")))
}

/// Stripe.js wants plain objects, so go through JSON rather than
/// `serde_wasm_bindgen`'s `Map` output.
fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, StripeError> {
    JsValue::from_serde(value).map_err(|err| StripeError::local(err.to_string()))
}
