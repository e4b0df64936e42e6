mod bindings;
mod checkout_component;
pub mod client;
mod components;
pub mod config;
pub mod error;
pub mod guard;
mod interop;
pub mod orchestrator;
pub mod page;
pub mod payment_method;

pub use bindings::*;
pub use checkout_component::*;
pub use client::{CardWidget, StripeGateway};
pub use components::*;
pub use config::CheckoutConfig;
pub use error::{CheckoutError, StripeError};
pub use guard::{SubmissionGuard, SubmissionState};
pub use interop::*;
pub use orchestrator::{PaymentConfirmationOrchestrator, PaymentGateway};
pub use page::{ConfirmationToken, PaymentPage};
pub use payment_method::{PaymentMethodChoice, PaymentMethodSelector};
