use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, SettlePaymentEntity},
    errors::StoreResult,
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    /// Fails with `StoreError::Conflict` on a duplicate tran_id.
    async fn insert(&self, payment: InsertPaymentEntity) -> StoreResult<PaymentEntity>;

    async fn find_by_tran_id(&self, tran_id: &str) -> StoreResult<Option<PaymentEntity>>;

    async fn list(&self) -> StoreResult<Vec<PaymentEntity>>;

    /// Applies a terminal write only while the payment is still `initiated`.
    /// Returns `None` when no initiated payment carries this tran_id, so two
    /// racing callbacks cannot both win.
    async fn settle(
        &self,
        tran_id: &str,
        settlement: SettlePaymentEntity,
    ) -> StoreResult<Option<PaymentEntity>>;
}
