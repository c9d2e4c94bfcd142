//! Server-side status polling, the fallback confirmation path.
//!
//! One session polls the status-check endpoint for one payment reference
//! until the server settles the record, the deadline passes, or the session
//! is superseded. Checks are strictly sequential and transport failures are
//! retried silently; the payer only ever sees a terminal outcome.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use domain_types::errors::CustomResult;
use error_stack::report;
use serde::Deserialize;
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
    time::MissedTickBehavior,
};
use url::Url;

use crate::flow::PaymentCallbacks;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);
/// Consecutive not-found results tolerated before the session gives up.
/// Covers the window between the widget callback and the intent landing in
/// the server-side store.
pub const DEFAULT_NOT_FOUND_GRACE: u32 = 5;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PollError {
    #[error("payment could not be verified before the deadline")]
    Timeout,
    #[error("payment was declined: {0}")]
    GatewayDeclined(String),
    #[error("checkout was cancelled")]
    Cancelled,
    #[error("status check transport failure: {0}")]
    Transport(String),
}

/// Client-local, presentational view of a polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Processing,
    Checking,
    Success,
    Error,
}

/// Outcome of one status-check round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Completed { gateway_reference: Option<String> },
    Pending,
    Declined { message: String },
    NotFound,
}

/// Seam over the status-check endpoint call.
#[async_trait::async_trait]
pub trait StatusCheck: Send + Sync {
    async fn check(
        &self,
        reference: &str,
        gateway_reference: Option<&str>,
    ) -> CustomResult<CheckOutcome, PollError>;
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub deadline: Duration,
    pub not_found_grace: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
            not_found_grace: DEFAULT_NOT_FOUND_GRACE,
        }
    }
}

#[derive(Debug)]
struct ActiveSession {
    token: u64,
    abort: AbortHandle,
}

/// At most one live session per reference. Starting a new session for a
/// reference aborts whatever was polling it before.
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    sessions: Mutex<HashMap<String, ActiveSession>>,
    next_token: AtomicU64,
}

impl SessionRegistry {
    fn next_token(&self) -> u64 {
        self.inner.next_token.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, reference: &str, token: u64, abort: AbortHandle) {
        let mut sessions = self.lock();
        if let Some(prior) = sessions.insert(reference.to_string(), ActiveSession { token, abort })
        {
            prior.abort.abort();
            tracing::debug!(reference, "superseded an active polling session");
        }
    }

    /// Remove the entry, but only if it still belongs to this session.
    fn finish(&self, reference: &str, token: u64) {
        let mut sessions = self.lock();
        if sessions
            .get(reference)
            .is_some_and(|session| session.token == token)
        {
            sessions.remove(reference);
        }
    }

    fn is_active(&self, reference: &str) -> bool {
        self.lock().contains_key(reference)
    }

    fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveSession>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawns and tracks polling sessions.
pub struct StatusPoller {
    checker: Arc<dyn StatusCheck>,
    config: PollerConfig,
    registry: SessionRegistry,
}

impl StatusPoller {
    pub fn new(checker: Arc<dyn StatusCheck>, config: PollerConfig) -> Self {
        Self {
            checker,
            config,
            registry: SessionRegistry::default(),
        }
    }

    pub fn is_polling(&self, reference: &str) -> bool {
        self.registry.is_active(reference)
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.active_count()
    }

    /// Start polling for a reference. The first check runs immediately, the
    /// rest on the configured interval. Exactly one of `on_success` /
    /// `on_error` fires unless the session is superseded or the handle is
    /// dropped first.
    pub fn start(
        &self,
        reference: String,
        gateway_reference: Option<String>,
        callbacks: Arc<dyn PaymentCallbacks>,
    ) -> PollHandle {
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let token = self.registry.next_token();
        let registry = self.registry.clone();
        let checker = self.checker.clone();
        let config = self.config.clone();
        let task_reference = reference.clone();

        let task = tokio::spawn(async move {
            run_session(
                checker,
                config,
                &task_reference,
                gateway_reference,
                callbacks,
                state_tx,
            )
            .await;
            registry.finish(&task_reference, token);
        });
        self.registry.register(&reference, token, task.abort_handle());

        PollHandle {
            reference,
            token,
            registry: self.registry.clone(),
            state: state_rx,
            task,
        }
    }
}

async fn run_session(
    checker: Arc<dyn StatusCheck>,
    config: PollerConfig,
    reference: &str,
    gateway_reference: Option<String>,
    callbacks: Arc<dyn PaymentCallbacks>,
    state: watch::Sender<SessionState>,
) {
    enum Settled {
        Success { gateway_reference: Option<String> },
        Failed(PollError),
    }

    let _ = state.send(SessionState::Processing);
    let deadline = tokio::time::Instant::now() + config.deadline;

    let settled = tokio::time::timeout_at(deadline, async {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut not_found_streak = 0u32;

        loop {
            ticker.tick().await;
            let _ = state.send(SessionState::Checking);

            match checker.check(reference, gateway_reference.as_deref()).await {
                Ok(CheckOutcome::Completed {
                    gateway_reference: confirmed,
                }) => {
                    return Settled::Success {
                        gateway_reference: confirmed.or_else(|| gateway_reference.clone()),
                    };
                }
                Ok(CheckOutcome::Declined { message }) => {
                    return Settled::Failed(PollError::GatewayDeclined(message));
                }
                Ok(CheckOutcome::Pending) => {
                    not_found_streak = 0;
                }
                Ok(CheckOutcome::NotFound) => {
                    not_found_streak += 1;
                    if not_found_streak >= config.not_found_grace {
                        return Settled::Failed(PollError::GatewayDeclined(
                            "no payment record found for this reference".to_string(),
                        ));
                    }
                }
                // Transport trouble stays invisible; the next tick retries.
                Err(error) => {
                    tracing::debug!(reference, ?error, "status check failed, retrying");
                }
            }

            let _ = state.send(SessionState::Processing);
        }
    })
    .await;

    match settled {
        Ok(Settled::Success { gateway_reference }) => {
            let _ = state.send(SessionState::Success);
            tracing::info!(reference, "payment confirmed");
            callbacks.on_success(reference, gateway_reference.as_deref());
        }
        Ok(Settled::Failed(error)) => {
            let _ = state.send(SessionState::Error);
            tracing::warn!(reference, %error, "payment settled as failed");
            callbacks.on_error(error);
        }
        Err(_elapsed) => {
            let _ = state.send(SessionState::Error);
            tracing::warn!(reference, "verification deadline reached");
            callbacks.on_error(PollError::Timeout);
        }
    }
}

/// Handle on a live polling session. Dropping it tears the session down; an
/// unobserved poller must not keep hitting the endpoint.
#[derive(Debug)]
pub struct PollHandle {
    reference: String,
    token: u64,
    registry: SessionRegistry,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session settles, is superseded, or is aborted.
    pub async fn wait(mut self) {
        let _ = (&mut self.task).await;
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.registry.finish(&self.reference, self.token);
    }
}

#[derive(Debug, Deserialize)]
struct StatusCheckBody {
    status: String,
    #[serde(default)]
    payment: Option<PaymentBody>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    #[serde(default)]
    gateway_response: Option<GatewayResponseBody>,
}

#[derive(Debug, Deserialize)]
struct GatewayResponseBody {
    #[serde(default)]
    gateway_reference: Option<String>,
}

/// Production check against the reconciliation server's status-check
/// endpoint.
pub struct HttpStatusCheck {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpStatusCheck {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl StatusCheck for HttpStatusCheck {
    async fn check(
        &self,
        reference: &str,
        gateway_reference: Option<&str>,
    ) -> CustomResult<CheckOutcome, PollError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({
                "reference": reference,
                "gateway_reference": gateway_reference,
            }))
            .send()
            .await
            .map_err(|error| report!(PollError::Transport(error.to_string())))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(CheckOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(report!(PollError::Transport(format!(
                "status check returned {status}"
            ))));
        }

        let body: StatusCheckBody = response
            .json()
            .await
            .map_err(|error| report!(PollError::Transport(error.to_string())))?;

        match body.status.as_str() {
            "completed" => Ok(CheckOutcome::Completed {
                gateway_reference: body
                    .payment
                    .and_then(|payment| payment.gateway_response)
                    .and_then(|gateway| gateway.gateway_reference),
            }),
            "error" => Ok(CheckOutcome::Declined {
                message: body.error.unwrap_or_else(|| "payment failed".to_string()),
            }),
            _ => Ok(CheckOutcome::Pending),
        }
    }
}
