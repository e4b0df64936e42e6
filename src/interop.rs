//! interop.rs
//!
//! Custom Yew hook to load Stripe.js v3 at runtime (no inline JS).
//!
//! # Overview
//! This hook, `use_stripejs()`, injects a single
//! `<script id="stripejs-sdk" src="https://js.stripe.com/v3/" defer>`
//! into `<head>` on first use (or waits on one already in the page),
//! returns `false` until the
//! script’s `load` event fires, then returns `true`
//! on every subsequent call.
//!
//! # Usage
//! ```rust,ignore
//! use yew::prelude::*;
//! use booking_checkout::use_stripejs;
//!
//! #[function_component(App)]
//! fn app() -> Html {
//!     let stripe_ready = use_stripejs();
//!     html! {
//!         if stripe_ready {
//!             <p>{"Stripe.js loaded"}</p>
//!         } else {
//!             <p>{"Loading Stripe.js..."}</p>
//!         }
//!     }
//! }
//! ```

use yew::prelude::*;
use yew::functional::hook;
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::js_sys::Reflect;
use web_sys::{EventTarget, HtmlScriptElement};

const STRIPE_JS_URL: &str = "https://js.stripe.com/v3/";
const SCRIPT_ID: &str = "stripejs-sdk";

/// Custom hook: load Stripe.js v3 exactly once and track readiness.
///
/// # Returns
/// - `false` while the `<script>` is being fetched & parsed.
/// - `true` once `window.Stripe` exists (script loaded & parsed).
#[hook]
pub fn use_stripejs() -> bool {
    // Initialize state: check if `window.Stripe` already present
    let loaded = use_state(stripe_global_present);

    {
        let loaded = loaded.clone();
        use_effect_with((), move |_| {
            if stripe_global_present() {
                loaded.set(true);
            } else if !*loaded {
                if let Err(err) = inject_stripe_script(move || loaded.set(true)) {
                    tracing::error!("could not load Stripe.js: {err:?}");
                }
            }
            || ()
        });
    }

    *loaded
}

fn stripe_global_present() -> bool {
    web_sys::window()
        .and_then(|win| Reflect::has(&win, &JsValue::from_str("Stripe")).ok())
        .unwrap_or(false)
}

/// Append the Stripe.js `<script>` to `<head>`, or wait on the one already
/// there (another component, or the page itself, may have added it).
fn inject_stripe_script(on_load: impl Fn() + 'static) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|win| win.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    if let Some(existing) = document.get_element_by_id(SCRIPT_ID) {
        return watch_script(&existing, on_load);
    }

    let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
    script.set_id(SCRIPT_ID);
    script.set_src(STRIPE_JS_URL);
    script.set_defer(true);
    watch_script(&script, on_load)?;

    document
        .head()
        .ok_or_else(|| JsValue::from_str("no <head>"))?
        .append_child(&script)?;
    Ok(())
}

/// Call `on_load` on the script's `load` event; log its `error` event.
fn watch_script(script: &EventTarget, on_load: impl Fn() + 'static) -> Result<(), JsValue> {
    let onload = Closure::wrap(Box::new(move || {
        tracing::debug!("Stripe.js loaded");
        on_load();
    }) as Box<dyn Fn()>);
    script.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    // Leak so it lives until the load event.
    onload.forget();

    let onerror = Closure::wrap(Box::new(move || {
        tracing::error!("Stripe.js failed to load from {STRIPE_JS_URL}, card payments are unavailable");
    }) as Box<dyn Fn()>);
    script.add_event_listener_with_callback("error", onerror.as_ref().unchecked_ref())?;
    onerror.forget();
    Ok(())
}
