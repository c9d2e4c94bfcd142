use std::sync::Arc;

use domain_types::{errors::CustomResult, payment::PaymentIntent};

use crate::{
    poller::{PollError, PollHandle, StatusPoller},
    resolver::{resolve_close, CloseDecision, ConfirmationStrategy},
    widget::{WidgetAdapter, WidgetError, WidgetEvent},
};

/// Terminal notifications for one checkout attempt. Exactly one of these
/// fires per attempt, however the attempt ends.
pub trait PaymentCallbacks: Send + Sync {
    fn on_success(&self, reference: &str, gateway_reference: Option<&str>);
    fn on_error(&self, error: PollError);
    fn on_close(&self);
}

/// Wires the widget adapter, the close resolver and the status poller into
/// one checkout attempt.
pub struct CheckoutFlow {
    widget: WidgetAdapter,
    poller: StatusPoller,
    strategy: ConfirmationStrategy,
}

impl CheckoutFlow {
    pub fn new(widget: WidgetAdapter, poller: StatusPoller) -> Self {
        Self {
            widget,
            poller,
            strategy: ConfirmationStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ConfirmationStrategy) -> Self {
        self.strategy = strategy.normalize();
        self
    }

    /// Run one checkout attempt end to end.
    ///
    /// Returns the poll handle while the outcome is still being reconciled;
    /// dropping the handle tears the polling session down. `None` means the
    /// attempt already reached its terminal callback.
    pub async fn run(
        &self,
        intent: &PaymentIntent,
        callbacks: Arc<dyn PaymentCallbacks>,
    ) -> CustomResult<Option<PollHandle>, WidgetError> {
        // A failed open never reaches the payer, so the error is the single
        // signal for the attempt; no callback fires alongside it.
        let mut session = self.widget.open_checkout(intent).await?;

        while let Some(event) = session.next_event().await {
            match event {
                WidgetEvent::Success {
                    reference,
                    gateway_reference,
                } => {
                    // The callback is a claim; server-side verification
                    // settles it. The poller's immediate first check is
                    // that verification, and it keeps going if the gateway
                    // is still settling.
                    return Ok(Some(
                        self.poller.start(reference, gateway_reference, callbacks),
                    ));
                }
                WidgetEvent::Failure { message } => {
                    callbacks.on_error(PollError::GatewayDeclined(message));
                    return Ok(None);
                }
                WidgetEvent::Closed => {
                    return Ok(self.handle_close(intent, callbacks));
                }
            }
        }

        // The widget went away without a terminal event; same ambiguity as
        // an explicit close.
        Ok(self.handle_close(intent, callbacks))
    }

    fn handle_close(
        &self,
        intent: &PaymentIntent,
        callbacks: Arc<dyn PaymentCallbacks>,
    ) -> Option<PollHandle> {
        match (self.strategy.normalize(), resolve_close(true)) {
            (ConfirmationStrategy::Polling, CloseDecision::EscalateToPolling) => {
                Some(self.poller.start(intent.reference.clone(), None, callbacks))
            }
            _ => {
                callbacks.on_close();
                None
            }
        }
    }
}
