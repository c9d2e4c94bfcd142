#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use checkout::{CheckOutcome, PaymentCallbacks, PollError, StatusCheck};
use domain_types::errors::CustomResult;
use error_stack::report;

/// One scripted status-check reply.
#[derive(Debug, Clone)]
pub enum Step {
    Completed(Option<String>),
    Pending,
    NotFound,
    Declined(String),
    Transport,
}

/// Replays a script of replies, then repeats the fallback forever.
pub struct ScriptedCheck {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
}

impl ScriptedCheck {
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
            fallback,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusCheck for ScriptedCheck {
    async fn check(
        &self,
        _reference: &str,
        _gateway_reference: Option<&str>,
    ) -> CustomResult<CheckOutcome, PollError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            Step::Completed(gateway_reference) => Ok(CheckOutcome::Completed { gateway_reference }),
            Step::Pending => Ok(CheckOutcome::Pending),
            Step::NotFound => Ok(CheckOutcome::NotFound),
            Step::Declined(message) => Ok(CheckOutcome::Declined { message }),
            Step::Transport => Err(report!(PollError::Transport(
                "connection reset by peer".to_string()
            ))),
        }
    }
}

/// Records every terminal callback it receives.
#[derive(Default)]
pub struct Recorder {
    successes: Mutex<Vec<(String, Option<String>)>>,
    errors: Mutex<Vec<PollError>>,
    closes: AtomicUsize,
}

impl Recorder {
    pub fn successes(&self) -> Vec<(String, Option<String>)> {
        self.successes.lock().expect("successes lock").clone()
    }

    pub fn errors(&self) -> Vec<PollError> {
        self.errors.lock().expect("errors lock").clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl PaymentCallbacks for Recorder {
    fn on_success(&self, reference: &str, gateway_reference: Option<&str>) {
        self.successes.lock().expect("successes lock").push((
            reference.to_string(),
            gateway_reference.map(str::to_string),
        ));
    }

    fn on_error(&self, error: PollError) {
        self.errors.lock().expect("errors lock").push(error);
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
