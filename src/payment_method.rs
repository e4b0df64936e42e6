//! Payment method choice and the section toggling that follows it.

use serde::{Deserialize, Serialize};

use crate::page::PaymentPage;

/// Label on the submit button while a card payment is selected.
pub const CARD_SUBMIT_LABEL: &str = "Confirm Card Payment";
/// Label on the submit button for every other method.
pub const BOOKING_SUBMIT_LABEL: &str = "Confirm Booking";

/// Payment methods offered on the booking page.
///
/// Serialized with the values the booking server expects in the
/// `payment_method` form field.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaymentMethodChoice {
    #[default]
    #[serde(rename = "card")]
    Card,
    #[serde(rename = "CASH")]
    Cash,
    #[serde(rename = "GCASH")]
    GCash,
}

impl PaymentMethodChoice {
    pub const ALL: [PaymentMethodChoice; 3] = [Self::Card, Self::Cash, Self::GCash];

    /// Value posted in the hidden `payment_method` field.
    pub fn form_value(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "CASH",
            Self::GCash => "GCASH",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Card => "Credit / Debit Card",
            Self::Cash => "Cash",
            Self::GCash => "GCash",
        }
    }

    /// Element id of the radio input for this method.
    pub fn input_id(self) -> &'static str {
        match self {
            Self::Card => "creditCard",
            Self::Cash => "cashPayment",
            Self::GCash => "gcashPayment",
        }
    }

    /// Whether the payment has to be authorized through Stripe before the
    /// booking form may be posted.
    pub fn requires_external_authorization(self) -> bool {
        matches!(self, Self::Card)
    }
}

/// The detail section shown below the method radios.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailSection {
    /// Card input and cardholder name.
    Card,
    /// Instructions for paying at the counter or by e-wallet.
    Other,
}

/// What the page should look like for the current method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodLayout {
    pub method: PaymentMethodChoice,
    pub section: DetailSection,
    pub cardholder_name_required: bool,
    pub submit_label: &'static str,
}

impl MethodLayout {
    pub fn for_method(method: PaymentMethodChoice) -> Self {
        let card = method == PaymentMethodChoice::Card;
        Self {
            method,
            section: if card { DetailSection::Card } else { DetailSection::Other },
            cardholder_name_required: card,
            submit_label: if card { CARD_SUBMIT_LABEL } else { BOOKING_SUBMIT_LABEL },
        }
    }

    pub fn is_visible(&self, section: DetailSection) -> bool {
        self.section == section
    }
}

impl Default for MethodLayout {
    fn default() -> Self {
        Self::for_method(PaymentMethodChoice::default())
    }
}

/// What the host has to do with the card widget after a selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetLifecycle {
    /// Card was just selected: mount the widget.
    Mount,
    /// Card was just deselected: tear the widget down.
    Unmount,
    /// Nothing changes for the widget.
    Keep,
}

/// Tracks the selected payment method.
#[derive(Debug, Default)]
pub struct PaymentMethodSelector {
    current: Option<PaymentMethodChoice>,
}

impl PaymentMethodSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected method. Before the first `select` this is the default.
    pub fn current(&self) -> PaymentMethodChoice {
        self.current.unwrap_or_default()
    }

    /// Select `choice`, push its layout to the page and clear any error.
    ///
    /// Called once on page load with the pre-selected method, then on each
    /// change of the method radios.
    pub fn select<P: PaymentPage>(&mut self, choice: PaymentMethodChoice, page: &P) -> WidgetLifecycle {
        let was_card = self.current == Some(PaymentMethodChoice::Card);
        self.current = Some(choice);

        page.apply_layout(&MethodLayout::for_method(choice));
        page.show_error(None);

        match (was_card, choice == PaymentMethodChoice::Card) {
            (false, true) => WidgetLifecycle::Mount,
            (true, false) => WidgetLifecycle::Unmount,
            _ => WidgetLifecycle::Keep,
        }
    }
}
