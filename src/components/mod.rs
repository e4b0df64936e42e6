use yew::prelude::*;
use web_sys::HtmlInputElement;

use crate::payment_method::PaymentMethodChoice;

/// The form's submit button.
#[derive(Properties, PartialEq)]
pub struct SubmitButtonProps {
    /// Button label text
    pub label: AttrValue,
    /// Disable state
    #[prop_or_default]
    pub disabled: bool,
}

#[function_component(SubmitButton)]
pub fn submit_button(props: &SubmitButtonProps) -> Html {
    html! {
        <button
            type="submit"
            id="submit-button"
            disabled={props.disabled}
            class="btn btn-primary w-100"
        >
            { &props.label }
        </button>
    }
}

/// One radio of the payment method group.
#[derive(Properties, PartialEq)]
pub struct MethodRadioProps {
    pub method: PaymentMethodChoice,
    pub checked: bool,
    /// Emits `method` when this radio becomes checked
    pub onselect: Callback<PaymentMethodChoice>,
}

#[function_component(MethodRadio)]
pub fn method_radio(props: &MethodRadioProps) -> Html {
    let method = props.method;
    let onselect = props.onselect.clone();
    html! {
        <div class="form-check">
            <input
                type="radio"
                class="form-check-input"
                name="payment_option"
                id={method.input_id()}
                value={method.form_value()}
                checked={props.checked}
                onchange={Callback::from(move |e: Event| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    if input.checked() {
                        onselect.emit(method);
                    }
                })}
            />
            <label class="form-check-label" for={method.input_id()}>{ method.label() }</label>
        </div>
    }
}

/// Error area below the card input.
#[derive(Properties, PartialEq)]
pub struct CardErrorsProps {
    #[prop_or_default]
    pub message: Option<String>,
}

#[function_component(CardErrors)]
pub fn card_errors(props: &CardErrorsProps) -> Html {
    html! {
        <div id="card-errors" class="text-danger mb-3">
            if let Some(message) = &props.message {
                <span class="icon" role="alert">
                    <i class="fas fa-times"></i>
                </span>
                <span>{ message }</span>
            }
        </div>
    }
}

/// Blocking overlay shown while a submission is in flight.
#[derive(Properties, PartialEq)]
pub struct LoadingOverlayProps {
    pub visible: bool,
}

#[function_component(LoadingOverlay)]
pub fn loading_overlay(props: &LoadingOverlayProps) -> Html {
    if !props.visible {
        return Html::default();
    }
    html! {
        <div id="loading-overlay" class="loading-overlay" aria-busy="true">
            <span class="spinner-border text-light" role="status"></span>
            <p class="text-light mt-2">{ "Processing your booking…" }</p>
        </div>
    }
}
