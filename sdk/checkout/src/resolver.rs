//! Decides what a widget close means.
//!
//! A close event carries no information about the charge itself: the payer
//! may have closed a finished checkout before the success callback fired,
//! or abandoned one that never started. The only close that can safely be
//! read as a cancellation is one where the overlay never opened at all.

/// What to do when the overlay closes without a success callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// The widget never opened; nothing could have been charged.
    Cancelled,
    /// The widget was open, so a charge may exist. Poll until the server
    /// settles it one way or the other.
    EscalateToPolling,
}

pub fn resolve_close(widget_opened: bool) -> CloseDecision {
    if widget_opened {
        CloseDecision::EscalateToPolling
    } else {
        CloseDecision::Cancelled
    }
}

/// How a checkout confirms its outcome once the widget is out of the
/// picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfirmationStrategy {
    /// Trust the widget's success callback alone. Only suitable where the
    /// embedding page controls the whole lifecycle and a missed callback is
    /// acceptable as a cancellation.
    DirectCallback,
    /// Ask the payer whether they completed the payment.
    #[deprecated(note = "self-reported outcomes are unverifiable; use `Polling`")]
    CloseConfirmation,
    /// Poll the status-check endpoint until the server settles the record.
    #[default]
    Polling,
}

impl ConfirmationStrategy {
    /// Collapse strategies that cannot produce a trustworthy outcome.
    /// `CloseConfirmation` delegates the answer to the payer, which is the
    /// exact ambiguity polling removes, so it is normalized to `Polling`.
    pub fn normalize(self) -> Self {
        #[allow(deprecated)]
        match self {
            Self::CloseConfirmation => Self::Polling,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_before_open_is_a_cancellation() {
        assert_eq!(resolve_close(false), CloseDecision::Cancelled);
    }

    #[test]
    fn close_after_open_escalates_to_polling() {
        assert_eq!(resolve_close(true), CloseDecision::EscalateToPolling);
    }

    #[test]
    fn self_reporting_is_normalized_to_polling() {
        #[allow(deprecated)]
        let strategy = ConfirmationStrategy::CloseConfirmation;
        assert_eq!(strategy.normalize(), ConfirmationStrategy::Polling);
        assert_eq!(
            ConfirmationStrategy::DirectCallback.normalize(),
            ConfirmationStrategy::DirectCallback
        );
    }
}
