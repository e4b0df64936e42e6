//! Submission guard: one attempt at a time, and the locked/loading UI that
//! goes with it.

use std::cell::Cell;

use crate::page::PaymentPage;
use crate::payment_method::PaymentMethodChoice;

pub const TERMS_NOT_ACCEPTED_MESSAGE: &str = "Please agree to the Terms & Conditions.";
pub const CARDHOLDER_NAME_MISSING_MESSAGE: &str = "Please enter the name on the card.";

/// Where the current submission attempt stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    InProgress,
    /// Waiting on a 3-D Secure (or similar) challenge.
    AwaitingExternalAction,
    Failed,
    Succeeded,
}

impl SubmissionState {
    /// Allowed edges. `Failed → Idle` re-arms the guard for a retry.
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, InProgress)
                | (InProgress, Succeeded)
                | (InProgress, AwaitingExternalAction)
                | (InProgress, Failed)
                | (AwaitingExternalAction, Succeeded)
                | (AwaitingExternalAction, Failed)
                | (Failed, Idle)
        )
    }
}

/// How an attempt ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success,
    Failure(String),
}

/// The form values read at submit time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionForm {
    pub method: PaymentMethodChoice,
    pub terms_accepted: bool,
    pub cardholder_name: String,
}

/// Owns the [`SubmissionState`] and the page's locked state.
#[derive(Debug)]
pub struct SubmissionGuard<P> {
    page: P,
    state: Cell<SubmissionState>,
}

impl<P: PaymentPage> SubmissionGuard<P> {
    pub fn new(page: P) -> Self {
        Self {
            page,
            state: Cell::new(SubmissionState::Idle),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state.get()
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Start an attempt. Returns `false` and does nothing while another
    /// attempt is running or after the checkout has succeeded.
    pub fn begin_submission(&self) -> bool {
        if self.state() == SubmissionState::Failed {
            self.transition(SubmissionState::Idle);
        }
        if self.state() != SubmissionState::Idle {
            tracing::debug!("ignoring submit while {:?}", self.state());
            return false;
        }
        self.transition(SubmissionState::InProgress);
        self.page.show_error(None);
        self.page.set_controls_disabled(true);
        self.page.set_loading(true);
        true
    }

    /// Check terms acceptance and, for card payments, the cardholder name.
    /// A violation ends the attempt with a failure.
    pub fn check_preconditions(&self, form: &SubmissionForm) -> bool {
        let violation = if !form.terms_accepted {
            Some(TERMS_NOT_ACCEPTED_MESSAGE)
        } else if form.method == PaymentMethodChoice::Card && form.cardholder_name.trim().is_empty() {
            Some(CARDHOLDER_NAME_MISSING_MESSAGE)
        } else {
            None
        };

        match violation {
            Some(message) => {
                self.end_submission(SubmissionOutcome::Failure(message.to_string()));
                false
            }
            None => true,
        }
    }

    /// Record that a challenge step is now pending.
    pub fn await_external_action(&self) {
        self.transition(SubmissionState::AwaitingExternalAction);
    }

    /// Finish the attempt.
    ///
    /// Failures unlock the page and show `message`; success leaves it locked
    /// since the page is about to navigate away.
    pub fn end_submission(&self, outcome: SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Success => {
                self.transition(SubmissionState::Succeeded);
            }
            SubmissionOutcome::Failure(message) => {
                if !self.transition(SubmissionState::Failed) {
                    return;
                }
                tracing::warn!("payment submission failed: {message}");
                self.page.show_error(Some(&message));
                self.page.set_controls_disabled(false);
                self.page.set_loading(false);
            }
        }
    }

    fn transition(&self, next: SubmissionState) -> bool {
        let current = self.state();
        if !current.can_transition_to(next) {
            tracing::error!("refusing submission transition {current:?} -> {next:?}");
            return false;
        }
        self.state.set(next);
        true
    }
}
