mod common;

use std::sync::Arc;

use checkout::{
    CheckoutFlow, ConfirmationStrategy, PaymentIntentBuilder, PaymentWidget, PollError,
    PollerConfig, StatusPoller, WidgetAdapter, WidgetError, WidgetEvent,
};
use common::{Recorder, ScriptedCheck, Step};
use domain_types::{errors::CustomResult, payment::PaymentIntent};
use error_stack::report;
use tokio::sync::mpsc;

/// Emits a fixed sequence of widget events once opened.
struct ScriptedWidget {
    events: Vec<WidgetEvent>,
}

#[async_trait::async_trait]
impl PaymentWidget for ScriptedWidget {
    async fn load_script(&self) -> CustomResult<(), WidgetError> {
        Ok(())
    }

    async fn open(
        &self,
        _public_key: &str,
        _intent: &PaymentIntent,
        events: mpsc::Sender<WidgetEvent>,
    ) -> CustomResult<(), WidgetError> {
        let script = self.events.clone();
        tokio::spawn(async move {
            for event in script {
                let _ = events.send(event).await;
            }
        });
        Ok(())
    }
}

/// Never gets past the script bootstrap.
struct BrokenWidget;

#[async_trait::async_trait]
impl PaymentWidget for BrokenWidget {
    async fn load_script(&self) -> CustomResult<(), WidgetError> {
        Err(report!(WidgetError::ScriptLoadFailed(
            "inline script blocked by CSP".to_string()
        )))
    }

    async fn open(
        &self,
        _public_key: &str,
        _intent: &PaymentIntent,
        _events: mpsc::Sender<WidgetEvent>,
    ) -> CustomResult<(), WidgetError> {
        Ok(())
    }
}

fn intent() -> PaymentIntent {
    PaymentIntentBuilder::new()
        .amount(500000)
        .email("ada@example.com")
        .reference("CP-1-flow")
        .build()
        .expect("valid intent")
}

fn flow(events: Vec<WidgetEvent>, check: Arc<ScriptedCheck>, public_key: &str) -> CheckoutFlow {
    let widget = WidgetAdapter::new(public_key, Arc::new(ScriptedWidget { events }));
    CheckoutFlow::new(widget, StatusPoller::new(check, PollerConfig::default()))
}

#[tokio::test(start_paused = true)]
async fn widget_success_is_verified_before_on_success() {
    let check = Arc::new(ScriptedCheck::new(
        vec![Step::Completed(None)],
        Step::Pending,
    ));
    let flow = flow(
        vec![WidgetEvent::Success {
            reference: "CP-1-flow".to_string(),
            gateway_reference: Some("4099260516".to_string()),
        }],
        check.clone(),
        "pk_test_123",
    );
    let recorder = Arc::new(Recorder::default());

    let handle = flow
        .run(&intent(), recorder.clone())
        .await
        .expect("flow runs")
        .expect("polling handle");
    handle.wait().await;

    assert_eq!(check.call_count(), 1);
    assert_eq!(
        recorder.successes(),
        vec![("CP-1-flow".to_string(), Some("4099260516".to_string()))]
    );
    assert_eq!(recorder.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn close_after_open_escalates_to_polling() {
    let check = Arc::new(ScriptedCheck::new(
        vec![Step::Pending, Step::Completed(Some("4099260516".to_string()))],
        Step::Pending,
    ));
    let flow = flow(vec![WidgetEvent::Closed], check.clone(), "pk_test_123");
    let recorder = Arc::new(Recorder::default());

    let handle = flow
        .run(&intent(), recorder.clone())
        .await
        .expect("flow runs")
        .expect("close escalates to polling");
    handle.wait().await;

    assert_eq!(check.call_count(), 2);
    assert_eq!(
        recorder.successes(),
        vec![("CP-1-flow".to_string(), Some("4099260516".to_string()))]
    );
    // The close itself was not treated as a cancellation.
    assert_eq!(recorder.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn direct_callback_close_is_a_cancellation() {
    let check = Arc::new(ScriptedCheck::new(vec![], Step::Pending));
    let flow = flow(vec![WidgetEvent::Closed], check.clone(), "pk_test_123")
        .with_strategy(ConfirmationStrategy::DirectCallback);
    let recorder = Arc::new(Recorder::default());

    let handle = flow
        .run(&intent(), recorder.clone())
        .await
        .expect("flow runs");

    assert!(handle.is_none());
    assert_eq!(recorder.close_count(), 1);
    assert_eq!(check.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn widget_failure_is_terminal() {
    let check = Arc::new(ScriptedCheck::new(vec![], Step::Pending));
    let flow = flow(
        vec![WidgetEvent::Failure {
            message: "card declined".to_string(),
        }],
        check.clone(),
        "pk_test_123",
    );
    let recorder = Arc::new(Recorder::default());

    let handle = flow
        .run(&intent(), recorder.clone())
        .await
        .expect("flow runs");

    assert!(handle.is_none());
    assert_eq!(
        recorder.errors(),
        vec![PollError::GatewayDeclined("card declined".to_string())]
    );
    assert_eq!(check.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_public_key_surfaces_to_the_embedder() {
    let check = Arc::new(ScriptedCheck::new(vec![], Step::Pending));
    let flow = flow(vec![], check.clone(), "");
    let recorder = Arc::new(Recorder::default());

    let error = flow
        .run(&intent(), recorder.clone())
        .await
        .expect_err("must fail fast");

    assert!(matches!(
        error.current_context(),
        WidgetError::MissingPublicKey
    ));
    // Not a payer-visible cancellation.
    assert_eq!(recorder.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_script_load_returns_the_error_and_nothing_else() {
    let check = Arc::new(ScriptedCheck::new(vec![], Step::Pending));
    let widget = WidgetAdapter::new("pk_test_123", Arc::new(BrokenWidget));
    let flow = CheckoutFlow::new(widget, StatusPoller::new(check.clone(), PollerConfig::default()));
    let recorder = Arc::new(Recorder::default());

    let error = flow
        .run(&intent(), recorder.clone())
        .await
        .expect_err("open must fail");

    assert!(matches!(
        error.current_context(),
        WidgetError::ScriptLoadFailed(_)
    ));
    // The error is the only signal for the attempt; no callback fires.
    assert_eq!(recorder.close_count(), 0);
    assert!(recorder.successes().is_empty());
    assert!(recorder.errors().is_empty());
    assert_eq!(check.call_count(), 0);
}
