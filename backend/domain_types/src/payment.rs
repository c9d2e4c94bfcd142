use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Amount in the smallest unit of the currency (kobo, pesewas, cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MinorUnit(i64);

impl MinorUnit {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get_amount_as_i64(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for MinorUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settlement currencies supported by the gateway.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    Ngn,
    Ghs,
    Zar,
    Kes,
    Usd,
}

/// Durable payment state. Transitions are monotonic: `Pending` may move to
/// either terminal state, terminal states never move again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => next.is_terminal(),
            Self::Completed | Self::Failed => false,
        }
    }
}

/// Transaction states as reported by the gateway's verification API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GatewayTransactionStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
    Ongoing,
    Reversed,
}

impl GatewayTransactionStatus {
    /// The local status a gateway-side state corroborates. `None` means the
    /// gateway has not reached a terminal decision yet.
    pub fn terminal_payment_status(self) -> Option<PaymentStatus> {
        match self {
            Self::Success => Some(PaymentStatus::Completed),
            Self::Failed | Self::Reversed => Some(PaymentStatus::Failed),
            Self::Abandoned | Self::Pending | Self::Ongoing => None,
        }
    }
}

/// Client-constructed, ephemeral description of one payment attempt. The
/// reference is the idempotency key for every later lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub reference: String,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub email: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Verification payload recorded at the moment of terminal transition.
/// Written exactly once per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub gateway_reference: Option<String>,
    pub gateway_status: GatewayTransactionStatus,
    pub payload: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub verified_at: OffsetDateTime,
}

/// Server-persisted payment record, keyed by the client reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: u64,
    pub reference: String,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub email: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub status: PaymentStatus,
    pub gateway_response: Option<GatewayResponse>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PaymentRecord {
    pub fn from_intent(id: u64, intent: PaymentIntent) -> Self {
        Self {
            id,
            reference: intent.reference,
            amount: intent.amount,
            currency: intent.currency,
            email: intent.email,
            metadata: intent.metadata,
            status: PaymentStatus::Pending,
            gateway_response: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

const REFERENCE_PREFIX: &str = "CP";
const REFERENCE_SUFFIX_LENGTH: usize = 12;

/// Generate a fresh client reference: `CP-<epoch millis>-<random suffix>`.
pub fn generate_reference() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("{REFERENCE_PREFIX}-{millis}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_only_forward() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Completed));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn terminal_states_never_revert() {
        for terminal in [PaymentStatus::Completed, PaymentStatus::Failed] {
            assert!(!terminal.can_transition_to(PaymentStatus::Pending));
            assert!(!terminal.can_transition_to(PaymentStatus::Completed));
            assert!(!terminal.can_transition_to(PaymentStatus::Failed));
        }
    }

    #[test]
    fn gateway_status_mapping() {
        assert_eq!(
            GatewayTransactionStatus::Success.terminal_payment_status(),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(
            GatewayTransactionStatus::Reversed.terminal_payment_status(),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(
            GatewayTransactionStatus::Abandoned.terminal_payment_status(),
            None
        );
    }

    #[test]
    fn generated_references_are_unique() {
        let first = generate_reference();
        let second = generate_reference();
        assert!(first.starts_with("CP-"));
        assert_ne!(first, second);
    }
}
