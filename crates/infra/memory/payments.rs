use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, SettlePaymentEntity},
    errors::{StoreError, StoreResult},
    repositories::payments::PaymentRepository,
    value_objects::enums::payment_statuses::PaymentStatus,
};

/// Payments keyed by tran_id.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, PaymentEntity>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentStore {
    async fn insert(&self, payment: InsertPaymentEntity) -> StoreResult<PaymentEntity> {
        let mut rows = self.payments.write().await;
        if rows.contains_key(&payment.tran_id) {
            return Err(StoreError::Conflict(format!(
                "tran_id {} already exists",
                payment.tran_id
            )));
        }
        let entity = PaymentEntity::from(payment);
        rows.insert(entity.tran_id.clone(), entity.clone());
        Ok(entity)
    }

    async fn find_by_tran_id(&self, tran_id: &str) -> StoreResult<Option<PaymentEntity>> {
        Ok(self.payments.read().await.get(tran_id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<PaymentEntity>> {
        let rows = self.payments.read().await;
        let mut all: Vec<PaymentEntity> = rows.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn settle(
        &self,
        tran_id: &str,
        settlement: SettlePaymentEntity,
    ) -> StoreResult<Option<PaymentEntity>> {
        let mut rows = self.payments.write().await;
        match rows.get_mut(tran_id) {
            Some(payment) if payment.status == PaymentStatus::Initiated.as_str() => {
                settlement.apply_to(payment);
                Ok(Some(payment.clone()))
            }
            _ => Ok(None),
        }
    }
}
