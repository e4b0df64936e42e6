//! The booking payment form, ready to drop into the booking page.
//!
//! This component handles loading Stripe.js, toggling the payment method
//! sections, mounting the card input while "card" is selected, and submitting
//! the booking: cash and GCash bookings are posted straight away, card bookings
//! only after Stripe has confirmed the payment (including any 3-D Secure
//! challenge). On success the PaymentIntent id travels to the server in the
//! hidden `payment_intent_id` field of an ordinary form post.

use web_sys::{HtmlFormElement, HtmlInputElement};
use yew::prelude::*;

use crate::bindings::JsStripe;
use crate::client::{load_stripe, mount_card_element, CardSlot, StripeGateway, StripeSlot};
use crate::components::{CardErrors, LoadingOverlay, MethodRadio, SubmitButton};
use crate::config::CheckoutConfig;
use crate::error::GENERIC_FAILURE_MESSAGE;
use crate::guard::SubmissionForm;
use crate::orchestrator::PaymentConfirmationOrchestrator;
use crate::page::{ConfirmationToken, PaymentPage};
use crate::payment_method::{
    DetailSection, MethodLayout, PaymentMethodChoice, PaymentMethodSelector, WidgetLifecycle,
};
use crate::use_stripejs;

const CARD_MOUNT_SELECTOR: &str = "#card-element";

type Checkout = PaymentConfirmationOrchestrator<StripeGateway, YewPaymentPage>;

/// Properties for the [`BookingCheckout`] component.
///
/// # Fields
///
/// * `config` – Keys, client secret and passenger contact from the server.
/// * `action` – Where the booking form posts to (default: the current URL).
/// * `csrf_token` – Rendered as `csrfmiddlewaretoken` when present.
/// * `methods` – Payment methods offered, in display order.
/// * `children` – Booking summary rendered above the payment options.
#[derive(Properties, PartialEq, Clone)]
pub struct BookingCheckoutProps {
    pub config: CheckoutConfig,
    #[prop_or_default]
    pub action: AttrValue,
    #[prop_or_default]
    pub csrf_token: Option<AttrValue>,
    #[prop_or(PaymentMethodChoice::ALL.to_vec())]
    pub methods: Vec<PaymentMethodChoice>,
    #[prop_or_default]
    pub children: Children,
}

/// [`PaymentPage`] over the component's state handles and DOM refs.
#[derive(Clone)]
pub struct YewPaymentPage {
    layout: UseStateHandle<MethodLayout>,
    error: UseStateHandle<Option<String>>,
    controls_disabled: UseStateHandle<bool>,
    loading: UseStateHandle<bool>,
    card: CardSlot,
    form: NodeRef,
    token_field: NodeRef,
}

impl PaymentPage for YewPaymentPage {
    fn apply_layout(&self, layout: &MethodLayout) {
        self.layout.set(*layout);
    }

    fn show_error(&self, message: Option<&str>) {
        self.error.set(message.map(str::to_string));
    }

    fn set_controls_disabled(&self, disabled: bool) {
        self.controls_disabled.set(disabled);
        if let Some(card) = self.card.borrow().as_ref() {
            if let Err(err) = card.set_disabled(disabled) {
                tracing::warn!("card input update failed: {err}");
            }
        }
    }

    fn set_loading(&self, visible: bool) {
        self.loading.set(visible);
    }

    fn write_confirmation_token(&self, token: &ConfirmationToken) {
        match self.token_field.cast::<HtmlInputElement>() {
            Some(input) => input.set_value(token.as_str()),
            None => tracing::error!("payment_intent_id field is not rendered"),
        }
    }

    fn submit_native(&self) {
        // HTMLFormElement.submit() does not dispatch `submit`, so the
        // intercepting handler is not re-entered.
        match self.form.cast::<HtmlFormElement>() {
            Some(form) => {
                if let Err(err) = form.submit() {
                    tracing::error!("booking form submit failed: {err:?}");
                }
            }
            None => tracing::error!("booking form is not rendered"),
        }
    }
}

/// Mount or tear down the card input to match the selected method.
fn sync_card_widget(
    want_card: bool,
    stripe: Option<&JsStripe>,
    slot: &CardSlot,
    config: &CheckoutConfig,
    error: &UseStateHandle<Option<String>>,
) {
    if !want_card {
        if let Some(widget) = slot.borrow_mut().take() {
            if let Err(err) = widget.unmount() {
                tracing::warn!("card input unmount failed: {err}");
            }
        }
        return;
    }
    if slot.borrow().is_some() {
        return;
    }
    // Mounted once Stripe.js is ready.
    let Some(stripe) = stripe else { return };

    match mount_card_element(stripe, CARD_MOUNT_SELECTOR, &config.card_style) {
        Ok(mut widget) => {
            let error = error.clone();
            if let Err(err) = widget.on_change(move |event| {
                error.set(event.error.map(|e| e.message));
            }) {
                tracing::warn!("card change listener not attached: {err}");
            }
            *slot.borrow_mut() = Some(widget);
        }
        Err(err) => {
            tracing::error!("card input could not be mounted: {err}");
            error.set(Some(GENERIC_FAILURE_MESSAGE.to_string()));
        }
    }
}

fn display(visible: bool) -> &'static str {
    if visible {
        "display: block;"
    } else {
        "display: none;"
    }
}

/// Yew function component rendering the booking payment form.
///
/// # Example
///
/// ```rust,ignore
/// use yew::prelude::*;
/// use booking_checkout::{BookingCheckout, CheckoutConfig};
///
/// #[function_component(App)]
/// fn app() -> Html {
///     let config = CheckoutConfig::from_json_script("checkout-config")
///         .expect("checkout config embedded in page");
///     html! {
///         <BookingCheckout {config} action="/booking/payment/">
///             <p>{ "Manila → Coron, 2 passengers" }</p>
///         </BookingCheckout>
///     }
/// }
/// ```
#[function_component(BookingCheckout)]
pub fn booking_checkout(props: &BookingCheckoutProps) -> Html {
    let stripe_ready = use_stripejs();

    let layout = use_state(|| MethodLayout::for_method(props.config.default_method));
    let error = use_state(|| None::<String>);
    let controls_disabled = use_state(|| false);
    let loading = use_state(|| false);
    let stripe_loaded = use_state(|| false);

    let selector = use_mut_ref(PaymentMethodSelector::new);
    let card_slot: CardSlot = use_mut_ref(|| None);
    let stripe: StripeSlot = use_mut_ref(|| None);

    let form_ref = use_node_ref();
    let token_ref = use_node_ref();
    let terms_ref = use_node_ref();
    let name_ref = use_node_ref();

    let page = YewPaymentPage {
        layout: layout.clone(),
        error: error.clone(),
        controls_disabled: controls_disabled.clone(),
        loading: loading.clone(),
        card: card_slot.clone(),
        form: form_ref.clone(),
        token_field: token_ref.clone(),
    };

    // Built on first render so cash and GCash bookings never wait for Stripe.js.
    let checkout = {
        let gateway = StripeGateway::new(stripe.clone(), card_slot.clone());
        let page = page.clone();
        let config = props.config.clone();
        use_memo((), move |_| -> Checkout {
            PaymentConfirmationOrchestrator::new(config, gateway, page)
        })
    };

    // Apply the pre-selected method once.
    {
        let selector = selector.clone();
        let page = page.clone();
        let default_method = props.config.default_method;
        use_effect_with((), move |_| {
            selector.borrow_mut().select(default_method, &page);
            || ()
        });
    }

    // Once Stripe.js is loaded, create the client and mount the card input.
    {
        let selector = selector.clone();
        let card_slot = card_slot.clone();
        let stripe = stripe.clone();
        let error = error.clone();
        let stripe_loaded = stripe_loaded.clone();
        let config = props.config.clone();
        use_effect_with(stripe_ready, move |ready| {
            if *ready && stripe.borrow().is_none() {
                match load_stripe(&config.stripe_public_key) {
                    Ok(client) => {
                        let want_card = selector.borrow().current() == PaymentMethodChoice::Card;
                        sync_card_widget(want_card, Some(&client), &card_slot, &config, &error);
                        *stripe.borrow_mut() = Some(client);
                        stripe_loaded.set(true);
                        tracing::debug!("Stripe.js client ready");
                    }
                    Err(err) => {
                        tracing::error!("Stripe.js init failed: {err}");
                        error.set(Some(GENERIC_FAILURE_MESSAGE.to_string()));
                    }
                }
            }
            || ()
        });
    }

    let on_method_select = {
        let selector = selector.clone();
        let card_slot = card_slot.clone();
        let stripe = stripe.clone();
        let error = error.clone();
        let page = page.clone();
        let config = props.config.clone();
        Callback::from(move |choice: PaymentMethodChoice| {
            let lifecycle = selector.borrow_mut().select(choice, &page);
            let want_card = match lifecycle {
                WidgetLifecycle::Mount => true,
                WidgetLifecycle::Unmount => false,
                WidgetLifecycle::Keep => return,
            };
            sync_card_widget(want_card, stripe.borrow().as_ref(), &card_slot, &config, &error);
        })
    };

    let onsubmit = {
        let selector = selector.clone();
        let checkout = checkout.clone();
        let terms_ref = terms_ref.clone();
        let name_ref = name_ref.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let checkout = checkout.clone();
            let form = SubmissionForm {
                method: selector.borrow().current(),
                terms_accepted: terms_ref
                    .cast::<HtmlInputElement>()
                    .map(|input| input.checked())
                    .unwrap_or(false),
                cardholder_name: name_ref
                    .cast::<HtmlInputElement>()
                    .map(|input| input.value())
                    .unwrap_or_default(),
            };
            wasm_bindgen_futures::spawn_local(async move {
                let state = checkout.submit(&form).await;
                tracing::debug!("booking submission ended in {state:?}");
            });
        })
    };

    html! {
        <>
            <form
                ref={form_ref}
                id="payment-form"
                method="post"
                action={props.action.clone()}
                onsubmit={onsubmit}
                style={display(!*loading)}
            >
                if let Some(token) = &props.csrf_token {
                    <input type="hidden" name="csrfmiddlewaretoken" value={token.clone()} />
                }
                { for props.children.iter() }

                <fieldset class="mb-3" disabled={*controls_disabled}>
                    <legend>{ "Payment method" }</legend>
                    {
                        for props.methods.iter().map(|method| html! {
                            <MethodRadio
                                key={method.form_value()}
                                method={*method}
                                checked={layout.method == *method}
                                onselect={on_method_select.clone()}
                            />
                        })
                    }
                </fieldset>
                <input
                    type="hidden"
                    id="selected-payment-method-hidden"
                    name="payment_method"
                    value={layout.method.form_value()}
                />

                <div id="cardPaymentDetails" style={display(layout.is_visible(DetailSection::Card))}>
                    <label for="cardholder-name" class="form-label">{ "Name on card" }</label>
                    <input
                        ref={name_ref}
                        type="text"
                        id="cardholder-name"
                        name="cardholder_name"
                        class="form-control mb-2"
                        autocomplete="cc-name"
                        required={layout.cardholder_name_required}
                    />
                    <div id="card-element" class="form-control mb-2"></div>
                </div>
                <div id="otherPaymentDetails" style={display(layout.is_visible(DetailSection::Other))}>
                    <p>{ "Your seats are reserved now. Pay at the terminal counter or via GCash before the payment deadline shown on your booking." }</p>
                </div>

                <CardErrors message={(*error).clone()} />

                <div class="form-check mb-3">
                    <input ref={terms_ref} type="checkbox" class="form-check-input" id="termsCheck" name="terms_accepted" />
                    <label class="form-check-label" for="termsCheck">{ "I agree to the Terms & Conditions" }</label>
                </div>

                <input ref={token_ref} type="hidden" id="payment_intent_id" name="payment_intent_id" />

                <SubmitButton
                    label={layout.submit_label}
                    disabled={*controls_disabled || (layout.method.requires_external_authorization() && !*stripe_loaded)}
                />
            </form>
            <LoadingOverlay visible={*loading} />
        </>
    }
}
