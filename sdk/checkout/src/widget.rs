use std::sync::Arc;

use domain_types::{errors::CustomResult, payment::PaymentIntent};
use error_stack::report;
use tokio::sync::{mpsc, OnceCell};

const EVENT_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("gateway public key is not configured")]
    MissingPublicKey,
    #[error("checkout script failed to load: {0}")]
    ScriptLoadFailed(String),
    #[error("checkout widget failed to open: {0}")]
    OpenFailed(String),
}

/// What the embedded widget reports back, in the order it happens. A
/// `Success` is a claim, not a settlement; the server-side verification is
/// the only authority on the final status.
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    Success {
        reference: String,
        gateway_reference: Option<String>,
    },
    Failure {
        message: String,
    },
    Closed,
}

/// Seam over the embeddable checkout widget, so the flow logic can be
/// exercised without a browser.
#[async_trait::async_trait]
pub trait PaymentWidget: Send + Sync {
    /// Fetch and evaluate the gateway script. Called at most once per
    /// adapter; concurrent checkouts await the same load.
    async fn load_script(&self) -> CustomResult<(), WidgetError>;

    /// Open the checkout overlay for the given intent. Events flow back
    /// over `events` until the overlay closes.
    async fn open(
        &self,
        public_key: &str,
        intent: &PaymentIntent,
        events: mpsc::Sender<WidgetEvent>,
    ) -> CustomResult<(), WidgetError>;
}

/// One-time-bootstrapped handle on the gateway widget.
pub struct WidgetAdapter {
    public_key: String,
    widget: Arc<dyn PaymentWidget>,
    script: OnceCell<()>,
}

impl WidgetAdapter {
    pub fn new(public_key: impl Into<String>, widget: Arc<dyn PaymentWidget>) -> Self {
        Self {
            public_key: public_key.into(),
            widget,
            script: OnceCell::new(),
        }
    }

    /// Load the gateway script exactly once. A failed load is not cached;
    /// the next caller retries it.
    pub async fn ensure_loaded(&self) -> CustomResult<(), WidgetError> {
        self.script
            .get_or_try_init(|| self.widget.load_script())
            .await?;
        Ok(())
    }

    /// Open a checkout session for the intent.
    ///
    /// Fails before anything is shown when the public key is absent; an
    /// overlay that is guaranteed to be rejected by the gateway must never
    /// reach the payer.
    pub async fn open_checkout(
        &self,
        intent: &PaymentIntent,
    ) -> CustomResult<WidgetSession, WidgetError> {
        if self.public_key.trim().is_empty() {
            return Err(report!(WidgetError::MissingPublicKey));
        }

        self.ensure_loaded().await?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.widget
            .open(&self.public_key, intent, events_tx)
            .await?;

        tracing::debug!(reference = %intent.reference, "checkout widget opened");
        Ok(WidgetSession { events: events_rx })
    }
}

/// A live overlay. Yields events until the widget closes the channel.
#[derive(Debug)]
pub struct WidgetSession {
    events: mpsc::Receiver<WidgetEvent>,
}

impl WidgetSession {
    pub async fn next_event(&mut self) -> Option<WidgetEvent> {
        self.events.recv().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingWidget {
        loads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PaymentWidget for CountingWidget {
        async fn load_script(&self) -> CustomResult<(), WidgetError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn open(
            &self,
            _public_key: &str,
            intent: &PaymentIntent,
            events: mpsc::Sender<WidgetEvent>,
        ) -> CustomResult<(), WidgetError> {
            let reference = intent.reference.clone();
            tokio::spawn(async move {
                let _ = events
                    .send(WidgetEvent::Success {
                        reference,
                        gateway_reference: Some("4099260516".to_string()),
                    })
                    .await;
            });
            Ok(())
        }
    }

    fn intent() -> PaymentIntent {
        PaymentIntent {
            reference: "CP-1-abc".to_string(),
            amount: domain_types::payment::MinorUnit::new(500000),
            currency: domain_types::payment::Currency::Ngn,
            email: "ada@example.com".to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn script_loads_once_across_sessions() {
        let widget = Arc::new(CountingWidget {
            loads: AtomicUsize::new(0),
        });
        let adapter = WidgetAdapter::new("pk_test_123", widget.clone());

        for _ in 0..3 {
            let mut session = adapter.open_checkout(&intent()).await.expect("opens");
            assert!(matches!(
                session.next_event().await,
                Some(WidgetEvent::Success { .. })
            ));
        }

        assert_eq!(widget.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_public_key_fails_before_opening() {
        let widget = Arc::new(CountingWidget {
            loads: AtomicUsize::new(0),
        });
        let adapter = WidgetAdapter::new("", widget.clone());

        let error = adapter.open_checkout(&intent()).await.expect_err("fails");
        assert!(matches!(
            error.current_context(),
            WidgetError::MissingPublicKey
        ));
        // Nothing was bootstrapped for a checkout that cannot succeed.
        assert_eq!(widget.loads.load(Ordering::SeqCst), 0);
    }
}
