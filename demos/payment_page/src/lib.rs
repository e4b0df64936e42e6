// src/lib.rs
use booking_checkout::{BookingCheckout, CheckoutConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_web::MakeWebConsoleWriter;
use wasm_bindgen::prelude::*;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
struct PaymentPageProps {
    config: CheckoutConfig,
    csrf_token: Option<AttrValue>,
}

#[function_component(PaymentPage)]
fn payment_page(props: &PaymentPageProps) -> Html {
    html! {
        <BookingCheckout
            config={props.config.clone()}
            action="/booking/payment/"
            csrf_token={props.csrf_token.clone()}
        >
            <h2>{ "Complete your booking" }</h2>
        </BookingCheckout>
    }
}

/// Send `tracing` events to the browser console and panics to `console.error`.
fn init_logging() {
    console_error_panic_hook::set_once();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());
    let installed = tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(fmt_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Reads `#checkout-config` and renders the form into `#payment-root`.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    init_logging();

    let config = CheckoutConfig::from_json_script("checkout-config")
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let document = web_sys::window()
        .and_then(|win| win.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let root = document
        .get_element_by_id("payment-root")
        .ok_or_else(|| JsValue::from_str("#payment-root missing"))?;
    let csrf_token = root
        .get_attribute("data-csrf-token")
        .map(AttrValue::from);

    yew::Renderer::<PaymentPage>::with_root_and_props(root, PaymentPageProps { config, csrf_token })
        .render();
    Ok(())
}
