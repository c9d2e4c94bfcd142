//! Client-side checkout SDK for the payment reconciliation service.
//!
//! The widget callback is unreliable by nature: payers close the overlay,
//! networks drop the success event, and the gateway can settle a charge the
//! client never hears about. Everything here exists to turn that ambiguity
//! into exactly one terminal signal per checkout: `on_success`, `on_error`
//! or `on_close`.

pub mod flow;
pub mod intent;
pub mod poller;
pub mod resolver;
pub mod widget;

pub use flow::{CheckoutFlow, PaymentCallbacks};
pub use intent::{IntentError, PaymentIntentBuilder};
pub use poller::{
    CheckOutcome, HttpStatusCheck, PollError, PollHandle, PollerConfig, SessionState, StatusCheck,
    StatusPoller,
};
pub use resolver::{resolve_close, CloseDecision, ConfirmationStrategy};
pub use widget::{PaymentWidget, WidgetAdapter, WidgetError, WidgetEvent, WidgetSession};
