use domain_types::{
    errors::{CustomResult, StorageError},
    payment::{GatewayResponse, PaymentIntent, PaymentRecord},
};

/// Persistence seam for payment records. Implementations own the `id`
/// assignment and must enforce the monotonic status contract: `Pending`
/// moves to exactly one terminal state, `gateway_response` is written once,
/// records are never deleted.
#[async_trait::async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a fresh `Pending` record for the intent. Duplicate
    /// references are a conflict, not an upsert.
    async fn insert(&self, intent: PaymentIntent) -> CustomResult<PaymentRecord, StorageError>;

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> CustomResult<Option<PaymentRecord>, StorageError>;

    async fn mark_completed(
        &self,
        reference: &str,
        gateway_response: GatewayResponse,
    ) -> CustomResult<PaymentRecord, StorageError>;

    async fn mark_failed(
        &self,
        reference: &str,
        gateway_response: GatewayResponse,
    ) -> CustomResult<PaymentRecord, StorageError>;
}
