//! The host page as seen by the checkout logic.

use std::rc::Rc;

use crate::payment_method::MethodLayout;

/// Opaque PaymentIntent id handed to the booking server on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationToken(String);

impl ConfirmationToken {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the checkout needs to change on the page.
///
/// Methods take `&self`: implementations are handles onto shared UI state.
pub trait PaymentPage {
    /// Show the section for the selected method and set the required fields
    /// and submit label.
    fn apply_layout(&self, layout: &MethodLayout);

    /// Replace the error area with `message`, or clear it.
    fn show_error(&self, message: Option<&str>);

    /// Disable or enable the submit button and the card input together.
    fn set_controls_disabled(&self, disabled: bool);

    /// Show or hide the blocking loading overlay.
    fn set_loading(&self, visible: bool);

    /// Write the confirmation token into the hidden form field.
    fn write_confirmation_token(&self, token: &ConfirmationToken);

    /// Post the form natively, bypassing the intercepted submit handler.
    fn submit_native(&self);
}

impl<P: PaymentPage + ?Sized> PaymentPage for Rc<P> {
    fn apply_layout(&self, layout: &MethodLayout) {
        (**self).apply_layout(layout)
    }

    fn show_error(&self, message: Option<&str>) {
        (**self).show_error(message)
    }

    fn set_controls_disabled(&self, disabled: bool) {
        (**self).set_controls_disabled(disabled)
    }

    fn set_loading(&self, visible: bool) {
        (**self).set_loading(visible)
    }

    fn write_confirmation_token(&self, token: &ConfirmationToken) {
        (**self).write_confirmation_token(token)
    }

    fn submit_native(&self) {
        (**self).submit_native()
    }
}
