use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use domain_types::{
    errors::{CustomResult, StorageError},
    payment::{GatewayResponse, PaymentIntent, PaymentRecord, PaymentStatus},
};
use error_stack::report;
use interfaces::storage::PaymentStore;
use tokio::sync::RwLock;

/// Process-local payment store. Stands in for the hosted database of the
/// clinic application; enforces the same record contract the verification
/// service relies on: unique references, monotonic status transitions and a
/// write-once `gateway_response`.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    records: RwLock<HashMap<String, PaymentRecord>>,
    next_id: AtomicU64,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn transition(
        &self,
        reference: &str,
        target: PaymentStatus,
        gateway_response: GatewayResponse,
    ) -> CustomResult<PaymentRecord, StorageError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(reference)
            .ok_or_else(|| {
                report!(StorageError::NotFound {
                    reference: reference.to_string(),
                })
            })?;

        if !record.status.can_transition_to(target) {
            return Err(report!(StorageError::IllegalTransition {
                reference: reference.to_string(),
                from: record.status,
                to: target,
            }));
        }

        record.status = target;
        // can_transition_to only passes from Pending, so this is the first
        // and only write of the verification payload.
        record.gateway_response = Some(gateway_response);
        Ok(record.clone())
    }
}

#[async_trait::async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, intent: PaymentIntent) -> CustomResult<PaymentRecord, StorageError> {
        let mut records = self.records.write().await;
        if records.contains_key(&intent.reference) {
            return Err(report!(StorageError::DuplicateReference {
                reference: intent.reference,
            }));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let record = PaymentRecord::from_intent(id, intent);
        records.insert(record.reference.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> CustomResult<Option<PaymentRecord>, StorageError> {
        Ok(self.records.read().await.get(reference).cloned())
    }

    async fn mark_completed(
        &self,
        reference: &str,
        gateway_response: GatewayResponse,
    ) -> CustomResult<PaymentRecord, StorageError> {
        self.transition(reference, PaymentStatus::Completed, gateway_response)
            .await
    }

    async fn mark_failed(
        &self,
        reference: &str,
        gateway_response: GatewayResponse,
    ) -> CustomResult<PaymentRecord, StorageError> {
        self.transition(reference, PaymentStatus::Failed, gateway_response)
            .await
    }
}
