use domain_types::payment::{self, Currency, MinorUnit, PaymentIntent};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("amount must be a positive number of minor units")]
    InvalidAmount,
    #[error("payer email must not be empty")]
    MissingEmail,
    #[error("payment reference must not be empty")]
    EmptyReference,
}

/// Builds a [`PaymentIntent`] for one checkout attempt.
///
/// The reference is generated when not supplied; it is the idempotency key
/// for the whole reconciliation flow and must never be reused across
/// attempts.
#[derive(Debug, Default)]
pub struct PaymentIntentBuilder {
    amount: Option<i64>,
    currency: Option<Currency>,
    email: Option<String>,
    reference: Option<String>,
    metadata: serde_json::Value,
}

impl PaymentIntentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount in minor units of the selected currency.
    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Override the generated reference, e.g. when the caller persisted the
    /// intent server-side first.
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn build(self) -> Result<PaymentIntent, IntentError> {
        let amount = MinorUnit::new(self.amount.ok_or(IntentError::InvalidAmount)?);
        if !amount.is_positive() {
            return Err(IntentError::InvalidAmount);
        }

        let email = self.email.ok_or(IntentError::MissingEmail)?;
        if email.trim().is_empty() {
            return Err(IntentError::MissingEmail);
        }

        let reference = match self.reference {
            Some(reference) if reference.trim().is_empty() => {
                return Err(IntentError::EmptyReference)
            }
            Some(reference) => reference,
            None => payment::generate_reference(),
        };

        Ok(PaymentIntent {
            reference,
            amount,
            currency: self.currency.unwrap_or(Currency::Ngn),
            email,
            metadata: self.metadata,
        })
    }
}
