use std::sync::Arc;

use connector_integration::types::ConnectorData;
use domain_types::{
    connector_types::{ConnectorEnum, PaymentsVerifyData, VerifyResponseData},
    errors::{CustomResult, StorageError, VerificationError},
    payment::{GatewayResponse, PaymentRecord, PaymentStatus},
    router_data::{ConnectorAuthType, RouterData},
    types::{Connectors, Proxy},
};
use error_stack::{report, ResultExt};
use external_services::service::execute_connector_processing_step;
use interfaces::storage::PaymentStore;

use crate::metrics;

/// Result of one reconciliation pass over a payment record.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Completed(PaymentRecord),
    Failed {
        record: PaymentRecord,
        message: String,
    },
    StillPending(PaymentRecord),
}

/// Seam over the server-to-gateway verification call, so the service logic
/// can be exercised without network access.
#[async_trait::async_trait]
pub trait GatewayVerifier: Send + Sync {
    async fn verify_transaction(
        &self,
        data: PaymentsVerifyData,
    ) -> CustomResult<VerifyResponseData, VerificationError>;
}

/// Production verifier: drives the Paystack connector integration through
/// the outgoing-call pipeline.
pub struct PaystackGatewayVerifier {
    proxy: Proxy,
    connectors: Connectors,
}

impl PaystackGatewayVerifier {
    pub fn new(proxy: Proxy, connectors: Connectors) -> Self {
        Self { proxy, connectors }
    }

    fn auth_type(&self) -> CustomResult<ConnectorAuthType, VerificationError> {
        self.connectors
            .paystack
            .secret_key
            .clone()
            .map(|api_key| ConnectorAuthType::HeaderKey { api_key })
            .ok_or_else(|| report!(VerificationError::MissingConfiguration))
    }
}

#[async_trait::async_trait]
impl GatewayVerifier for PaystackGatewayVerifier {
    async fn verify_transaction(
        &self,
        data: PaymentsVerifyData,
    ) -> CustomResult<VerifyResponseData, VerificationError> {
        let connector_data = ConnectorData::get_connector_by_name(&ConnectorEnum::Paystack);
        let connector_name = connector_data.connector_name.to_string();

        let router_data = RouterData::new(
            self.connectors.clone(),
            self.auth_type()?,
            data.reference.clone(),
            data,
        );

        let timer = metrics::GATEWAY_VERIFICATION_LATENCY
            .with_label_values(&[&connector_name])
            .start_timer();
        let result = execute_connector_processing_step(
            &self.proxy,
            connector_data.verify_integration(),
            router_data,
        )
        .await;
        timer.observe_duration();

        let router_data = result
            .inspect_err(|_| {
                metrics::GATEWAY_VERIFICATION_CALLS_TOTAL
                    .with_label_values(&[&connector_name, "unreachable"])
                    .inc();
            })
            .change_context(VerificationError::GatewayUnreachable)?;

        match router_data.response {
            Ok(verified) => {
                metrics::GATEWAY_VERIFICATION_CALLS_TOTAL
                    .with_label_values(&[&connector_name, "ok"])
                    .inc();
                Ok(verified)
            }
            Err(error) if error.status_code >= 500 => {
                metrics::GATEWAY_VERIFICATION_CALLS_TOTAL
                    .with_label_values(&[&connector_name, "unreachable"])
                    .inc();
                Err(report!(VerificationError::GatewayUnreachable))
                    .attach_printable(format!("gateway 5xx: {}", error.message))
            }
            Err(error) => {
                metrics::GATEWAY_VERIFICATION_CALLS_TOTAL
                    .with_label_values(&[&connector_name, "rejected"])
                    .inc();
                Err(report!(VerificationError::GatewayRejection {
                    code: error.code,
                    message: error.message,
                }))
            }
        }
    }
}

/// The reconciliation authority. A payment becomes `Completed` only here,
/// and only after an independent gateway-side verification; the widget
/// callback on its own never settles anything.
pub struct VerificationService {
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn GatewayVerifier>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn PaymentStore>, gateway: Arc<dyn GatewayVerifier>) -> Self {
        Self { store, gateway }
    }

    pub async fn verify(
        &self,
        reference: &str,
        gateway_reference: Option<String>,
    ) -> CustomResult<VerificationOutcome, VerificationError> {
        let record = self
            .store
            .find_by_reference(reference)
            .await
            .change_context(VerificationError::StorageError)?
            .ok_or_else(|| report!(VerificationError::RecordNotFound))?;

        // Idempotent short-circuit: the poller calls this repeatedly, and a
        // settled record must not trigger another gateway round trip.
        match record.status {
            PaymentStatus::Completed => return Ok(VerificationOutcome::Completed(record)),
            PaymentStatus::Failed => {
                let message = failure_message(&record);
                return Ok(VerificationOutcome::Failed { record, message });
            }
            PaymentStatus::Pending => {}
        }

        let verify_data = PaymentsVerifyData {
            reference: reference.to_string(),
            gateway_reference,
        };

        let verified = match self.gateway.verify_transaction(verify_data).await {
            Ok(verified) => verified,
            Err(error) => {
                return match error.current_context() {
                    VerificationError::GatewayRejection { code, message } => {
                        // The gateway disowned the reference outright;
                        // settle the record as failed rather than leaving
                        // it pending forever.
                        let gateway_response = GatewayResponse {
                            gateway_reference: None,
                            gateway_status:
                                domain_types::payment::GatewayTransactionStatus::Failed,
                            payload: serde_json::json!({
                                "code": code,
                                "message": message,
                            }),
                            verified_at: time::OffsetDateTime::now_utc(),
                        };
                        let message = message.clone();
                        let record = self
                            .settle(reference, PaymentStatus::Failed, gateway_response)
                            .await?;
                        tracing::warn!(reference, %message, "gateway rejected the transaction");
                        match record.status {
                            PaymentStatus::Failed => {
                                Ok(VerificationOutcome::Failed { record, message })
                            }
                            _ => Ok(outcome_for(record)),
                        }
                    }
                    _ => Err(error),
                };
            }
        };

        if verified.amount != record.amount || verified.currency != record.currency {
            let mismatch = format!(
                "expected {} {}, gateway reported {} {}",
                record.amount, record.currency, verified.amount, verified.currency
            );
            let record = self
                .settle(reference, PaymentStatus::Failed, to_gateway_response(&verified))
                .await?;
            tracing::error!(reference, %mismatch, record_id = record.id, "verification integrity check failed");
            return Err(report!(VerificationError::IntegrityCheckFailed(mismatch)));
        }

        match verified.gateway_status.terminal_payment_status() {
            Some(target @ (PaymentStatus::Completed | PaymentStatus::Failed)) => {
                let record = self
                    .settle(reference, target, to_gateway_response(&verified))
                    .await?;
                match record.status {
                    PaymentStatus::Completed => {
                        tracing::info!(reference, "payment verified and completed");
                    }
                    _ => tracing::info!(reference, "payment verified as failed"),
                }
                Ok(outcome_for(record))
            }
            _ => Ok(VerificationOutcome::StillPending(record)),
        }
    }

    /// Writes a terminal status. When a concurrent verification already
    /// settled the record, the transition is rejected by the store; the
    /// record is then re-read and its settled state returned instead of
    /// surfacing an error for a payment that did settle.
    async fn settle(
        &self,
        reference: &str,
        target: PaymentStatus,
        gateway_response: GatewayResponse,
    ) -> CustomResult<PaymentRecord, VerificationError> {
        let result = match target {
            PaymentStatus::Completed => {
                self.store.mark_completed(reference, gateway_response).await
            }
            _ => self.store.mark_failed(reference, gateway_response).await,
        };
        match result {
            Ok(record) => Ok(record),
            Err(error)
                if matches!(
                    error.current_context(),
                    StorageError::IllegalTransition { .. }
                ) =>
            {
                tracing::debug!(reference, "record settled concurrently, re-reading");
                self.store
                    .find_by_reference(reference)
                    .await
                    .change_context(VerificationError::StorageError)?
                    .ok_or_else(|| report!(VerificationError::RecordNotFound))
            }
            Err(error) => Err(error.change_context(VerificationError::StorageError)),
        }
    }
}

fn outcome_for(record: PaymentRecord) -> VerificationOutcome {
    match record.status {
        PaymentStatus::Completed => VerificationOutcome::Completed(record),
        PaymentStatus::Failed => {
            let message = failure_message(&record);
            VerificationOutcome::Failed { record, message }
        }
        PaymentStatus::Pending => VerificationOutcome::StillPending(record),
    }
}

fn to_gateway_response(verified: &VerifyResponseData) -> GatewayResponse {
    GatewayResponse {
        gateway_reference: verified.gateway_reference.clone(),
        gateway_status: verified.gateway_status,
        payload: verified.payload.clone(),
        verified_at: verified.verified_at,
    }
}

fn failure_message(record: &PaymentRecord) -> String {
    record
        .gateway_response
        .as_ref()
        .map(|response| format!("payment {}", response.gateway_status))
        .unwrap_or_else(|| "payment failed".to_string())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use domain_types::payment::{
        Currency, GatewayTransactionStatus, MinorUnit, PaymentIntent,
    };
    use time::OffsetDateTime;
    use tokio::sync::Mutex;

    use super::*;
    use crate::storage::InMemoryPaymentStore;

    enum MockReply {
        Verified(GatewayTransactionStatus, MinorUnit),
        Unreachable,
        Rejected,
    }

    struct MockGateway {
        calls: AtomicUsize,
        script: Mutex<VecDeque<MockReply>>,
    }

    impl MockGateway {
        fn scripted(replies: Vec<MockReply>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(replies.into()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl GatewayVerifier for MockGateway {
        async fn verify_transaction(
            &self,
            _data: PaymentsVerifyData,
        ) -> CustomResult<VerifyResponseData, VerificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .script
                .lock()
                .await
                .pop_front()
                .unwrap_or(MockReply::Unreachable);
            match reply {
                MockReply::Verified(status, amount) => Ok(VerifyResponseData {
                    gateway_status: status,
                    gateway_reference: Some("ext1".to_string()),
                    amount,
                    currency: Currency::Ngn,
                    payload: serde_json::json!({"channel": "card"}),
                    verified_at: OffsetDateTime::now_utc(),
                }),
                MockReply::Unreachable => {
                    Err(report!(VerificationError::GatewayUnreachable))
                }
                MockReply::Rejected => Err(report!(VerificationError::GatewayRejection {
                    code: "transaction_not_found".to_string(),
                    message: "Transaction reference not found".to_string(),
                })),
            }
        }
    }

    const AMOUNT: i64 = 500000;

    async fn pending_record(store: &InMemoryPaymentStore, reference: &str) {
        store
            .insert(PaymentIntent {
                reference: reference.to_string(),
                amount: MinorUnit::new(AMOUNT),
                currency: Currency::Ngn,
                email: "ada@example.com".to_string(),
                metadata: serde_json::Value::Null,
            })
            .await
            .expect("insert pending record");
    }

    fn service(
        store: Arc<InMemoryPaymentStore>,
        gateway: Arc<MockGateway>,
    ) -> VerificationService {
        VerificationService::new(store, gateway)
    }

    #[tokio::test]
    async fn widget_success_verifies_once_and_completes() {
        let store = Arc::new(InMemoryPaymentStore::new());
        pending_record(&store, "r1").await;
        let gateway = MockGateway::scripted(vec![MockReply::Verified(
            GatewayTransactionStatus::Success,
            MinorUnit::new(AMOUNT),
        )]);
        let service = service(store.clone(), gateway.clone());

        let outcome = service
            .verify("r1", Some("ext1".to_string()))
            .await
            .expect("verification succeeds");

        let record = match outcome {
            VerificationOutcome::Completed(record) => record,
            other => panic!("expected completed, got {other:?}"),
        };
        assert_eq!(record.status, PaymentStatus::Completed);
        assert_eq!(gateway.call_count(), 1);
        let gateway_response = record.gateway_response.expect("written at transition");
        assert_eq!(gateway_response.gateway_reference.as_deref(), Some("ext1"));
    }

    #[tokio::test]
    async fn completed_record_short_circuits_without_gateway_call() {
        let store = Arc::new(InMemoryPaymentStore::new());
        pending_record(&store, "r1").await;
        let gateway = MockGateway::scripted(vec![MockReply::Verified(
            GatewayTransactionStatus::Success,
            MinorUnit::new(AMOUNT),
        )]);
        let service = service(store.clone(), gateway.clone());

        service
            .verify("r1", None)
            .await
            .expect("first verification");
        assert_eq!(gateway.call_count(), 1);

        for _ in 0..2 {
            let outcome = service.verify("r1", None).await.expect("repeat verification");
            assert!(matches!(outcome, VerificationOutcome::Completed(_)));
        }
        // No second gateway round trip once the record is terminal.
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn non_terminal_gateway_state_leaves_record_pending() {
        let store = Arc::new(InMemoryPaymentStore::new());
        pending_record(&store, "r1").await;
        let gateway = MockGateway::scripted(vec![MockReply::Verified(
            GatewayTransactionStatus::Abandoned,
            MinorUnit::new(AMOUNT),
        )]);
        let service = service(store.clone(), gateway.clone());

        let outcome = service.verify("r1", None).await.expect("verification");
        assert!(matches!(outcome, VerificationOutcome::StillPending(_)));

        let stored = store
            .find_by_reference("r1")
            .await
            .expect("lookup")
            .expect("record");
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert!(stored.gateway_response.is_none());
    }

    #[tokio::test]
    async fn unreachable_gateway_never_completes_a_payment() {
        let store = Arc::new(InMemoryPaymentStore::new());
        pending_record(&store, "r1").await;
        let gateway = MockGateway::scripted(vec![MockReply::Unreachable]);
        let service = service(store.clone(), gateway.clone());

        let error = service.verify("r1", None).await.expect_err("must fail");
        assert!(matches!(
            error.current_context(),
            VerificationError::GatewayUnreachable
        ));

        let stored = store
            .find_by_reference("r1")
            .await
            .expect("lookup")
            .expect("record");
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn gateway_rejection_settles_the_record_as_failed() {
        let store = Arc::new(InMemoryPaymentStore::new());
        pending_record(&store, "r1").await;
        let gateway = MockGateway::scripted(vec![MockReply::Rejected]);
        let service = service(store.clone(), gateway.clone());

        let outcome = service.verify("r1", None).await.expect("verification");
        let record = match outcome {
            VerificationOutcome::Failed { record, .. } => record,
            other => panic!("expected failed, got {other:?}"),
        };
        assert_eq!(record.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn amount_mismatch_fails_the_integrity_check() {
        let store = Arc::new(InMemoryPaymentStore::new());
        pending_record(&store, "r1").await;
        let gateway = MockGateway::scripted(vec![MockReply::Verified(
            GatewayTransactionStatus::Success,
            MinorUnit::new(AMOUNT - 1),
        )]);
        let service = service(store.clone(), gateway.clone());

        let error = service.verify("r1", None).await.expect_err("must fail");
        assert!(matches!(
            error.current_context(),
            VerificationError::IntegrityCheckFailed(_)
        ));

        let stored = store
            .find_by_reference("r1")
            .await
            .expect("lookup")
            .expect("record");
        // Mismatched money is terminal, not silently completed.
        assert_eq!(stored.status, PaymentStatus::Failed);
    }

    struct RacingGateway {
        store: Arc<InMemoryPaymentStore>,
    }

    #[async_trait::async_trait]
    impl GatewayVerifier for RacingGateway {
        async fn verify_transaction(
            &self,
            data: PaymentsVerifyData,
        ) -> CustomResult<VerifyResponseData, VerificationError> {
            // A second verification settles the record while this call is
            // still in flight.
            let response = GatewayResponse {
                gateway_reference: Some("ext1".to_string()),
                gateway_status: GatewayTransactionStatus::Success,
                payload: serde_json::json!({"channel": "card"}),
                verified_at: OffsetDateTime::now_utc(),
            };
            self.store
                .mark_completed(&data.reference, response)
                .await
                .change_context(VerificationError::StorageError)?;
            Ok(VerifyResponseData {
                gateway_status: GatewayTransactionStatus::Success,
                gateway_reference: Some("ext1".to_string()),
                amount: MinorUnit::new(AMOUNT),
                currency: Currency::Ngn,
                payload: serde_json::json!({"channel": "card"}),
                verified_at: OffsetDateTime::now_utc(),
            })
        }
    }

    #[tokio::test]
    async fn losing_a_settlement_race_still_returns_completed() {
        let store = Arc::new(InMemoryPaymentStore::new());
        pending_record(&store, "r1").await;
        let service = VerificationService::new(
            store.clone(),
            Arc::new(RacingGateway {
                store: store.clone(),
            }),
        );

        let outcome = service
            .verify("r1", None)
            .await
            .expect("loser of the race gets the settled outcome, not an error");
        assert!(matches!(outcome, VerificationOutcome::Completed(_)));

        let stored = store
            .find_by_reference("r1")
            .await
            .expect("lookup")
            .expect("record");
        assert_eq!(stored.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_reference_is_record_not_found() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let gateway = MockGateway::scripted(vec![]);
        let service = service(store, gateway.clone());

        let error = service.verify("ghost", None).await.expect_err("must fail");
        assert!(matches!(
            error.current_context(),
            VerificationError::RecordNotFound
        ));
        assert_eq!(gateway.call_count(), 0);
    }
}
