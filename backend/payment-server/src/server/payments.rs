use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use domain_types::{
    errors::VerificationError,
    payment::{self, Currency, MinorUnit, PaymentIntent, PaymentRecord},
};
use interfaces::storage::PaymentStore;
use serde::{Deserialize, Serialize};

use crate::{
    metrics,
    verification::{VerificationOutcome, VerificationService},
};

/// HTTP face of the reconciliation service: intent persistence and the
/// status-check endpoint the client-side poller talks to.
pub struct Payments {
    pub store: Arc<dyn PaymentStore>,
    pub verification: Arc<VerificationService>,
}

impl Payments {
    pub fn router(self) -> Router {
        Router::new()
            .route("/payments/initialize", post(initialize))
            .route("/payments/status-check", post(status_check))
            .with_state(Arc::new(self))
    }
}

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub amount: i64,
    pub currency: Currency,
    pub email: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub reference: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusCheckRequest {
    pub reference: String,
    pub gateway_reference: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Completed,
    Error,
}

#[derive(Debug, Serialize)]
pub struct StatusCheckResponse {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error payload for the HTTP surface.
#[derive(Debug)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "code": self.code,
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

async fn initialize(
    State(state): State<Arc<Payments>>,
    Json(request): Json<InitializeRequest>,
) -> Result<Json<InitializeResponse>, ApiErrorResponse> {
    let amount = MinorUnit::new(request.amount);
    if !amount.is_positive() {
        return Err(ApiErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "INVALID_AMOUNT",
            "amount must be a positive number of minor units",
        ));
    }
    if request.email.trim().is_empty() {
        return Err(ApiErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "INVALID_EMAIL",
            "email must not be empty",
        ));
    }

    let intent = PaymentIntent {
        reference: request
            .reference
            .unwrap_or_else(payment::generate_reference),
        amount,
        currency: request.currency,
        email: request.email,
        metadata: request.metadata,
    };

    let record = state.store.insert(intent).await.map_err(|error| {
        tracing::warn!(?error, "failed to persist payment intent");
        ApiErrorResponse::new(
            StatusCode::CONFLICT,
            "DUPLICATE_REFERENCE",
            "a payment with this reference already exists",
        )
    })?;

    tracing::info!(reference = %record.reference, "payment intent persisted");
    Ok(Json(InitializeResponse {
        reference: record.reference,
        status: record.status.to_string(),
    }))
}

async fn status_check(
    State(state): State<Arc<Payments>>,
    Json(request): Json<StatusCheckRequest>,
) -> Result<Json<StatusCheckResponse>, ApiErrorResponse> {
    let outcome = state
        .verification
        .verify(&request.reference, request.gateway_reference)
        .await;

    let response = match outcome {
        Ok(VerificationOutcome::Completed(record)) => {
            metrics::PAYMENT_STATUS_CHECKS_TOTAL
                .with_label_values(&["completed"])
                .inc();
            let gateway_data = record
                .gateway_response
                .as_ref()
                .map(|response| response.payload.clone());
            StatusCheckResponse {
                status: CheckStatus::Completed,
                payment: Some(record),
                gateway_data,
                error: None,
            }
        }
        Ok(VerificationOutcome::Failed { record, message }) => {
            metrics::PAYMENT_STATUS_CHECKS_TOTAL
                .with_label_values(&["error"])
                .inc();
            StatusCheckResponse {
                status: CheckStatus::Error,
                payment: Some(record),
                gateway_data: None,
                error: Some(message),
            }
        }
        Ok(VerificationOutcome::StillPending(record)) => {
            metrics::PAYMENT_STATUS_CHECKS_TOTAL
                .with_label_values(&["pending"])
                .inc();
            StatusCheckResponse {
                status: CheckStatus::Pending,
                payment: Some(record),
                gateway_data: None,
                error: None,
            }
        }
        Err(error) => {
            metrics::PAYMENT_STATUS_CHECKS_TOTAL
                .with_label_values(&["failed"])
                .inc();
            return match error.current_context() {
                VerificationError::RecordNotFound => Err(ApiErrorResponse::new(
                    StatusCode::NOT_FOUND,
                    "RECORD_NOT_FOUND",
                    "no payment record found for the given reference",
                )),
                VerificationError::MissingConfiguration => Err(ApiErrorResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NOT_CONFIGURED",
                    "payment system not configured, contact support",
                )),
                // A flaky gateway never fails the flow outright: the record
                // is still pending and the poller will try again.
                VerificationError::GatewayUnreachable => {
                    tracing::warn!(reference = %request.reference, "gateway unreachable during status check");
                    Ok(Json(StatusCheckResponse {
                        status: CheckStatus::Pending,
                        payment: None,
                        gateway_data: None,
                        error: None,
                    }))
                }
                VerificationError::IntegrityCheckFailed(mismatch) => {
                    Ok(Json(StatusCheckResponse {
                        status: CheckStatus::Error,
                        payment: None,
                        gateway_data: None,
                        error: Some(mismatch.clone()),
                    }))
                }
                _ => {
                    tracing::error!(?error, "status check failed");
                    Err(ApiErrorResponse::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "unable to check payment status",
                    ))
                }
            };
        }
    };

    Ok(Json(response))
}
