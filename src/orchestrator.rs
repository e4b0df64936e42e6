//! Drives one booking submission from the submit click to either a native form
//! post or a visible error.
//!
//! Card payments go through Stripe first:
//!
//! ```text
//! Idle ─► InProgress ─► Succeeded ─► token written, form posted
//!              │  ▲ requires_action
//!              │  └─────────────► AwaitingExternalAction ─► Succeeded
//!              ▼                                │
//!            Failed ◄────────────────────────────┘
//! ```
//!
//! Cash and GCash bookings skip Stripe and are posted as soon as the local
//! checks pass.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::config::{BillingDetails, CheckoutConfig};
use crate::error::StripeError;
use crate::guard::{SubmissionForm, SubmissionGuard, SubmissionOutcome, SubmissionState};
use crate::page::{ConfirmationToken, PaymentPage};

/// `paymentIntent.status` as reported by Stripe.js.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum IntentStatus {
    Succeeded,
    RequiresAction,
    /// Any other status (`requires_payment_method`, `processing`, ...).
    Other(String),
}

impl From<String> for IntentStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "succeeded" => IntentStatus::Succeeded,
            "requires_action" => IntentStatus::RequiresAction,
            _ => IntentStatus::Other(status),
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentStatus::Succeeded => f.write_str("succeeded"),
            IntentStatus::RequiresAction => f.write_str("requires_action"),
            IntentStatus::Other(status) => f.write_str(status),
        }
    }
}

/// The fields of a PaymentIntent the checkout looks at.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub client_secret: Option<String>,
}

pub type GatewayResult = Result<PaymentIntent, StripeError>;

/// The two Stripe.js calls a card payment needs.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// `stripe.confirmCardPayment(clientSecret, { payment_method })`
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        billing: Option<&BillingDetails>,
    ) -> GatewayResult;

    /// `stripe.handleCardAction(clientSecret)`
    async fn handle_card_action(&self, client_secret: &str) -> GatewayResult;
}

impl<G: PaymentGateway> PaymentGateway for Rc<G> {
    async fn confirm_card_payment(
        &self,
        client_secret: &str,
        billing: Option<&BillingDetails>,
    ) -> GatewayResult {
        (**self).confirm_card_payment(client_secret, billing).await
    }

    async fn handle_card_action(&self, client_secret: &str) -> GatewayResult {
        (**self).handle_card_action(client_secret).await
    }
}

/// One per page load. Shared as `Rc` with the submit handler.
#[derive(Debug)]
pub struct PaymentConfirmationOrchestrator<G, P> {
    config: CheckoutConfig,
    gateway: G,
    guard: SubmissionGuard<P>,
    token: OnceCell<ConfirmationToken>,
}

impl<G: PaymentGateway, P: PaymentPage> PaymentConfirmationOrchestrator<G, P> {
    pub fn new(config: CheckoutConfig, gateway: G, page: P) -> Self {
        Self {
            config,
            gateway,
            guard: SubmissionGuard::new(page),
            token: OnceCell::new(),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.guard.state()
    }

    pub fn confirmation_token(&self) -> Option<&ConfirmationToken> {
        self.token.get()
    }

    pub fn page(&self) -> &P {
        self.guard.page()
    }

    /// Handle a submit of the booking form.
    ///
    /// Returns the state the attempt ended in. A submit that arrives while
    /// another attempt is running changes nothing.
    pub async fn submit(&self, form: &SubmissionForm) -> SubmissionState {
        if !self.guard.begin_submission() {
            return self.state();
        }
        if !self.guard.check_preconditions(form) {
            return self.state();
        }

        if !form.method.requires_external_authorization() {
            tracing::info!("posting {} booking", form.method.form_value());
            self.guard.end_submission(SubmissionOutcome::Success);
            self.page().submit_native();
            return self.state();
        }

        let billing = self.config.billing_for(&form.cardholder_name);
        let intent = match self
            .gateway
            .confirm_card_payment(&self.config.client_secret, billing.as_ref())
            .await
        {
            Ok(intent) => intent,
            Err(err) => return self.fail_with_error("confirmCardPayment", err),
        };

        let intent = match intent.status.clone() {
            IntentStatus::Succeeded => intent,
            IntentStatus::RequiresAction => match self.run_challenge(&intent).await {
                Some(intent) => intent,
                None => return self.state(),
            },
            status => {
                return self.fail(format!(
                    "Payment not successful. Status: {status}. Please check details or try another method."
                ))
            }
        };

        self.finalize(ConfirmationToken::new(intent.id))
    }

    async fn run_challenge(&self, intent: &PaymentIntent) -> Option<PaymentIntent> {
        self.guard.await_external_action();
        let client_secret = intent
            .client_secret
            .as_deref()
            .unwrap_or(&self.config.client_secret);

        match self.gateway.handle_card_action(client_secret).await {
            Ok(next) if next.status == IntentStatus::Succeeded => Some(next),
            Ok(next) => {
                self.fail(format!(
                    "Payment not successful after action. Status: {}",
                    next.status
                ));
                None
            }
            Err(err) => {
                self.fail_with_error("handleCardAction", err);
                None
            }
        }
    }

    fn finalize(&self, token: ConfirmationToken) -> SubmissionState {
        if self.token.set(token.clone()).is_err() {
            tracing::error!("confirmation token already set, not posting twice");
            return self.state();
        }
        self.guard.end_submission(SubmissionOutcome::Success);
        tracing::info!("payment {token} confirmed, posting booking");
        self.page().write_confirmation_token(&token);
        self.page().submit_native();
        self.state()
    }

    fn fail_with_error(&self, call: &str, err: StripeError) -> SubmissionState {
        tracing::warn!(
            "{call} failed: type={:?} code={:?} message={}",
            err.error_type,
            err.code,
            err.message
        );
        self.fail(err.display_message())
    }

    fn fail(&self, message: String) -> SubmissionState {
        self.guard.end_submission(SubmissionOutcome::Failure(message));
        self.state()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Weak;

    use futures::executor::block_on;

    use super::*;
    use crate::error::GENERIC_FAILURE_MESSAGE;
    use crate::guard::{CARDHOLDER_NAME_MISSING_MESSAGE, TERMS_NOT_ACCEPTED_MESSAGE};
    use crate::page::testing::FakePage;
    use crate::payment_method::PaymentMethodChoice;

    type TestCheckout = PaymentConfirmationOrchestrator<Rc<FakeGateway>, Rc<FakePage>>;

    /// Answers Stripe calls from a script and records what was asked.
    #[derive(Default)]
    struct FakeGateway {
        confirm_replies: RefCell<VecDeque<GatewayResult>>,
        action_replies: RefCell<VecDeque<GatewayResult>>,
        confirm_calls: RefCell<Vec<(String, Option<BillingDetails>)>>,
        action_calls: RefCell<Vec<String>>,
        /// When set, the checkout state is recorded at each `handleCardAction`.
        watched: RefCell<Weak<TestCheckout>>,
        states_during_action: RefCell<Vec<SubmissionState>>,
    }

    impl FakeGateway {
        fn confirm_replies(self, replies: impl IntoIterator<Item = GatewayResult>) -> Self {
            self.confirm_replies.borrow_mut().extend(replies);
            self
        }

        fn action_replies(self, replies: impl IntoIterator<Item = GatewayResult>) -> Self {
            self.action_replies.borrow_mut().extend(replies);
            self
        }
    }

    impl PaymentGateway for FakeGateway {
        async fn confirm_card_payment(
            &self,
            client_secret: &str,
            billing: Option<&BillingDetails>,
        ) -> GatewayResult {
            self.confirm_calls
                .borrow_mut()
                .push((client_secret.to_string(), billing.cloned()));
            self.confirm_replies
                .borrow_mut()
                .pop_front()
                .expect("unexpected confirmCardPayment call")
        }

        async fn handle_card_action(&self, client_secret: &str) -> GatewayResult {
            self.action_calls.borrow_mut().push(client_secret.to_string());
            if let Some(checkout) = self.watched.borrow().upgrade() {
                self.states_during_action.borrow_mut().push(checkout.state());
            }
            self.action_replies
                .borrow_mut()
                .pop_front()
                .expect("unexpected handleCardAction call")
        }
    }

    fn intent(id: &str, status: &str) -> GatewayResult {
        Ok(PaymentIntent {
            id: id.to_string(),
            status: IntentStatus::from(status.to_string()),
            client_secret: Some(format!("{id}_secret_action")),
        })
    }

    fn stripe_error(kind: &str, message: &str) -> GatewayResult {
        Err(StripeError {
            message: message.to_string(),
            error_type: Some(kind.to_string()),
            code: None,
        })
    }

    fn card_form() -> SubmissionForm {
        SubmissionForm {
            method: PaymentMethodChoice::Card,
            terms_accepted: true,
            cardholder_name: "Ana Cruz".to_string(),
        }
    }

    fn checkout(gateway: FakeGateway) -> (TestCheckout, Rc<FakeGateway>, Rc<FakePage>) {
        let gateway = Rc::new(gateway);
        let page = Rc::new(FakePage::default());
        let config = CheckoutConfig::new("pk_test_1", "pi_1_secret_abc");
        let orchestrator = PaymentConfirmationOrchestrator::new(config, gateway.clone(), page.clone());
        (orchestrator, gateway, page)
    }

    #[test]
    fn immediate_success_posts_form_with_token() {
        let (checkout, gateway, page) =
            checkout(FakeGateway::default().confirm_replies([intent("pi_1", "succeeded")]));

        let state = block_on(checkout.submit(&card_form()));

        assert_eq!(state, SubmissionState::Succeeded);
        assert_eq!(checkout.confirmation_token(), Some(&ConfirmationToken::new("pi_1")));
        let page = page.snapshot();
        assert_eq!(page.token_field.as_deref(), Some("pi_1"));
        assert_eq!(page.native_submits, 1);
        assert!(page.controls_disabled);
        assert!(page.loading);
        assert_eq!(gateway.confirm_calls.borrow()[0].0, "pi_1_secret_abc");
        assert!(gateway.action_calls.borrow().is_empty());
    }

    #[test]
    fn challenge_then_success_uses_action_intent_id() {
        let (checkout, gateway, page) = checkout(
            FakeGateway::default()
                .confirm_replies([intent("pi_1", "requires_action")])
                .action_replies([intent("pi_1_after", "succeeded")]),
        );

        let state = block_on(checkout.submit(&card_form()));

        assert_eq!(state, SubmissionState::Succeeded);
        assert_eq!(*gateway.action_calls.borrow(), vec!["pi_1_secret_action".to_string()]);
        assert_eq!(page.snapshot().token_field.as_deref(), Some("pi_1_after"));
        assert_eq!(page.snapshot().native_submits, 1);
    }

    #[test]
    fn challenge_falls_back_to_configured_client_secret() {
        let (checkout, gateway, _page) = checkout(
            FakeGateway::default()
                .confirm_replies([Ok(PaymentIntent {
                    id: "pi_1".into(),
                    status: IntentStatus::RequiresAction,
                    client_secret: None,
                })])
                .action_replies([intent("pi_1", "succeeded")]),
        );

        block_on(checkout.submit(&card_form()));
        assert_eq!(*gateway.action_calls.borrow(), vec!["pi_1_secret_abc".to_string()]);
    }

    #[test]
    fn card_error_is_shown_verbatim_and_page_unlocked() {
        let (checkout, _gateway, page) = checkout(
            FakeGateway::default().confirm_replies([stripe_error("card_error", "Your card was declined.")]),
        );

        let state = block_on(checkout.submit(&card_form()));

        assert_eq!(state, SubmissionState::Failed);
        assert_eq!(checkout.confirmation_token(), None);
        let page = page.snapshot();
        assert_eq!(page.error.as_deref(), Some("Your card was declined."));
        assert!(!page.controls_disabled);
        assert!(!page.loading);
        assert_eq!(page.native_submits, 0);
        assert_eq!(page.token_field, None);
    }

    #[test]
    fn unrecognized_error_shows_generic_message() {
        let (checkout, _gateway, page) = checkout(
            FakeGateway::default().confirm_replies([stripe_error("api_error", "Internal: req_8f2 upstream 502")]),
        );

        block_on(checkout.submit(&card_form()));
        assert_eq!(page.snapshot().error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn other_status_after_confirm_reports_status() {
        let (checkout, _gateway, page) =
            checkout(FakeGateway::default().confirm_replies([intent("pi_1", "requires_payment_method")]));

        let state = block_on(checkout.submit(&card_form()));

        assert_eq!(state, SubmissionState::Failed);
        assert_eq!(
            page.snapshot().error.as_deref(),
            Some("Payment not successful. Status: requires_payment_method. Please check details or try another method.")
        );
    }

    #[test]
    fn failed_challenge_reports_error_or_status() {
        let (checkout, _gateway, page) = checkout(
            FakeGateway::default()
                .confirm_replies([intent("pi_1", "requires_action"), intent("pi_1", "requires_action")])
                .action_replies([
                    stripe_error("card_error", "We are unable to authenticate your payment method."),
                    intent("pi_1", "requires_payment_method"),
                ]),
        );

        assert_eq!(block_on(checkout.submit(&card_form())), SubmissionState::Failed);
        assert_eq!(
            page.snapshot().error.as_deref(),
            Some("We are unable to authenticate your payment method.")
        );

        assert_eq!(block_on(checkout.submit(&card_form())), SubmissionState::Failed);
        assert_eq!(
            page.snapshot().error.as_deref(),
            Some("Payment not successful after action. Status: requires_payment_method")
        );
        assert_eq!(page.snapshot().native_submits, 0);
    }

    #[test]
    fn challenge_runs_while_awaiting_external_action() {
        let (checkout, gateway, page) = checkout(
            FakeGateway::default()
                .confirm_replies([intent("pi_1", "requires_action")])
                .action_replies([intent("pi_1", "succeeded")]),
        );
        let checkout = Rc::new(checkout);
        *gateway.watched.borrow_mut() = Rc::downgrade(&checkout);

        assert_eq!(block_on(checkout.submit(&card_form())), SubmissionState::Succeeded);
        assert_eq!(
            *gateway.states_during_action.borrow(),
            vec![SubmissionState::AwaitingExternalAction]
        );
        assert!(page.snapshot().loading);
    }

    #[test]
    fn unrecognized_challenge_error_shows_generic_message() {
        let (checkout, _gateway, page) = checkout(
            FakeGateway::default()
                .confirm_replies([intent("pi_1", "requires_action")])
                .action_replies([stripe_error("api_error", "authentication service unavailable: req_41c")]),
        );

        assert_eq!(block_on(checkout.submit(&card_form())), SubmissionState::Failed);
        let page = page.snapshot();
        assert_eq!(page.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
        assert!(!page.controls_disabled);
        assert_eq!(page.native_submits, 0);
        assert_eq!(checkout.confirmation_token(), None);
    }

    #[test]
    fn retry_after_failure_can_succeed() {
        let (checkout, gateway, page) = checkout(FakeGateway::default().confirm_replies([
            stripe_error("card_error", "Your card has insufficient funds."),
            intent("pi_1", "succeeded"),
        ]));

        assert_eq!(block_on(checkout.submit(&card_form())), SubmissionState::Failed);
        assert_eq!(block_on(checkout.submit(&card_form())), SubmissionState::Succeeded);

        assert_eq!(gateway.confirm_calls.borrow().len(), 2);
        let page = page.snapshot();
        assert_eq!(page.error, None);
        assert_eq!(page.native_submits, 1);
    }

    #[test]
    fn unchecked_terms_never_reach_stripe() {
        let (checkout, gateway, page) = checkout(FakeGateway::default());
        let form = SubmissionForm {
            terms_accepted: false,
            ..card_form()
        };

        assert_eq!(block_on(checkout.submit(&form)), SubmissionState::Failed);
        assert!(gateway.confirm_calls.borrow().is_empty());
        assert_eq!(page.snapshot().error.as_deref(), Some(TERMS_NOT_ACCEPTED_MESSAGE));
    }

    #[test]
    fn blank_cardholder_name_never_reaches_stripe() {
        let (checkout, gateway, page) = checkout(FakeGateway::default());
        let form = SubmissionForm {
            cardholder_name: "   ".into(),
            ..card_form()
        };

        assert_eq!(block_on(checkout.submit(&form)), SubmissionState::Failed);
        assert!(gateway.confirm_calls.borrow().is_empty());
        assert_eq!(page.snapshot().error.as_deref(), Some(CARDHOLDER_NAME_MISSING_MESSAGE));
    }

    #[test]
    fn non_card_methods_post_immediately() {
        for method in [PaymentMethodChoice::Cash, PaymentMethodChoice::GCash] {
            let (checkout, gateway, page) = checkout(FakeGateway::default());
            let form = SubmissionForm {
                method,
                terms_accepted: true,
                cardholder_name: String::new(),
            };

            assert_eq!(block_on(checkout.submit(&form)), SubmissionState::Succeeded);
            assert!(gateway.confirm_calls.borrow().is_empty());
            assert_eq!(page.snapshot().native_submits, 1);
            assert_eq!(page.snapshot().token_field, None);
        }
    }

    #[test]
    fn submit_after_success_is_ignored() {
        let (checkout, gateway, page) =
            checkout(FakeGateway::default().confirm_replies([intent("pi_1", "succeeded")]));

        block_on(checkout.submit(&card_form()));
        assert_eq!(block_on(checkout.submit(&card_form())), SubmissionState::Succeeded);

        assert_eq!(gateway.confirm_calls.borrow().len(), 1);
        assert_eq!(page.snapshot().native_submits, 1);
    }

    #[test]
    fn billing_details_follow_config() {
        let (checkout, gateway, _page) =
            checkout(FakeGateway::default().confirm_replies([intent("pi_1", "succeeded")]));
        block_on(checkout.submit(&SubmissionForm {
            cardholder_name: "  Ana Cruz  ".into(),
            ..card_form()
        }));
        let billing = gateway.confirm_calls.borrow()[0].1.clone().unwrap();
        assert_eq!(billing.name.as_deref(), Some("Ana Cruz"));

        let gateway = Rc::new(FakeGateway::default().confirm_replies([intent("pi_2", "succeeded")]));
        let mut config = CheckoutConfig::new("pk_test_1", "pi_2_secret");
        config.billing_details = false;
        let checkout = PaymentConfirmationOrchestrator::new(config, gateway.clone(), FakePage::default());
        block_on(checkout.submit(&card_form()));
        assert_eq!(gateway.confirm_calls.borrow()[0].1, None);
    }

    #[test]
    fn intent_status_deserializes_from_stripe_strings() {
        let intent: PaymentIntent = serde_json::from_str(
            r#"{"id":"pi_1","status":"requires_action","client_secret":"pi_1_secret_x","amount":1000}"#,
        )
        .unwrap();
        assert_eq!(intent.status, IntentStatus::RequiresAction);

        let intent: PaymentIntent = serde_json::from_str(r#"{"id":"pi_1","status":"processing"}"#).unwrap();
        assert_eq!(intent.status, IntentStatus::Other("processing".into()));
        assert_eq!(intent.status.to_string(), "processing");
        assert_eq!(intent.client_secret, None);
    }
}
