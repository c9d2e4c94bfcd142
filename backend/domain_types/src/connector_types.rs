use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::payment::{Currency, GatewayTransactionStatus, MinorUnit};

#[derive(Clone, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectorEnum {
    Paystack,
}

/// Request data for the `Verify` flow. The gateway reference is preferred
/// for the lookup when the widget reported one; the client reference is the
/// fallback and the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsVerifyData {
    pub reference: String,
    pub gateway_reference: Option<String>,
}

impl PaymentsVerifyData {
    /// Identifier to use against the gateway's verification endpoint.
    pub fn lookup_reference(&self) -> &str {
        self.gateway_reference.as_deref().unwrap_or(&self.reference)
    }
}

/// Normalized result of one gateway verification call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponseData {
    pub gateway_status: GatewayTransactionStatus,
    pub gateway_reference: Option<String>,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub payload: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub verified_at: OffsetDateTime,
}
