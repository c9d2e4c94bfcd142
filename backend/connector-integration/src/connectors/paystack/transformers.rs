use domain_types::{
    connector_types::VerifyResponseData,
    payment::{Currency, GatewayTransactionStatus, MinorUnit},
    router_data::ErrorResponse,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Envelope of every Paystack API response. `status` reports whether the
/// API call itself was understood, not the transaction outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackVerifyResponse {
    pub status: bool,
    pub message: String,
    pub data: Option<PaystackTransactionData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackTransactionData {
    pub id: Option<u64>,
    pub status: PaystackTransactionStatus,
    pub reference: String,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub gateway_response: Option<String>,
    pub paid_at: Option<String>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaystackTransactionStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
    Ongoing,
    Processing,
    Queued,
    Reversed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaystackErrorResponse {
    pub status: bool,
    pub message: String,
    pub code: Option<String>,
}

pub fn to_gateway_status(status: PaystackTransactionStatus) -> GatewayTransactionStatus {
    match status {
        PaystackTransactionStatus::Success => GatewayTransactionStatus::Success,
        PaystackTransactionStatus::Failed => GatewayTransactionStatus::Failed,
        PaystackTransactionStatus::Abandoned => GatewayTransactionStatus::Abandoned,
        PaystackTransactionStatus::Pending => GatewayTransactionStatus::Pending,
        PaystackTransactionStatus::Ongoing
        | PaystackTransactionStatus::Processing
        | PaystackTransactionStatus::Queued => GatewayTransactionStatus::Ongoing,
        PaystackTransactionStatus::Reversed => GatewayTransactionStatus::Reversed,
    }
}

impl TryFrom<PaystackVerifyResponse> for VerifyResponseData {
    type Error = ErrorResponse;

    fn try_from(response: PaystackVerifyResponse) -> Result<Self, Self::Error> {
        let data = match response.data {
            Some(data) if response.status => data,
            _ => {
                return Err(ErrorResponse {
                    status_code: 0,
                    code: "verification_failed".to_string(),
                    message: response.message.clone(),
                    reason: Some(response.message),
                })
            }
        };

        let payload = serde_json::to_value(&data).unwrap_or(serde_json::Value::Null);

        Ok(Self {
            gateway_status: to_gateway_status(data.status),
            gateway_reference: data.id.map(|id| id.to_string()),
            amount: data.amount,
            currency: data.currency,
            payload,
            verified_at: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_types::payment::PaymentStatus;

    fn verify_body(status: &str) -> PaystackVerifyResponse {
        serde_json::from_value(serde_json::json!({
            "status": true,
            "message": "Verification successful",
            "data": {
                "id": 4099260516u64,
                "status": status,
                "reference": "CP-1700000000000-a1b2c3d4e5f6",
                "amount": 500000,
                "currency": "NGN",
                "gateway_response": "Successful",
                "paid_at": "2024-08-22T09:15:02.000Z",
                "channel": "card"
            }
        }))
        .expect("fixture must deserialize")
    }

    #[test]
    fn successful_verification_maps_to_completed() {
        let parsed = VerifyResponseData::try_from(verify_body("success"))
            .expect("success payload must convert");
        assert_eq!(parsed.gateway_status, GatewayTransactionStatus::Success);
        assert_eq!(
            parsed.gateway_status.terminal_payment_status(),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(parsed.gateway_reference.as_deref(), Some("4099260516"));
        assert_eq!(parsed.amount, MinorUnit::new(500000));
        assert_eq!(parsed.currency, Currency::Ngn);
    }

    #[test]
    fn abandoned_verification_is_not_terminal() {
        let parsed = VerifyResponseData::try_from(verify_body("abandoned"))
            .expect("abandoned payload must convert");
        assert_eq!(parsed.gateway_status.terminal_payment_status(), None);
    }

    #[test]
    fn queued_and_processing_collapse_to_ongoing() {
        for raw in ["queued", "processing"] {
            let parsed = VerifyResponseData::try_from(verify_body(raw))
                .expect("non-terminal payload must convert");
            assert_eq!(parsed.gateway_status, GatewayTransactionStatus::Ongoing);
        }
    }

    #[test]
    fn missing_data_is_a_gateway_error() {
        let response: PaystackVerifyResponse = serde_json::from_value(serde_json::json!({
            "status": false,
            "message": "Transaction reference not found"
        }))
        .expect("error fixture must deserialize");

        let error = VerifyResponseData::try_from(response).expect_err("must not convert");
        assert_eq!(error.code, "verification_failed");
        assert_eq!(error.message, "Transaction reference not found");
    }
}
