use async_trait::async_trait;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;

use super::run_blocking;
use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, SettlePaymentEntity},
    errors::StoreResult,
    repositories::payments::PaymentRepository,
    value_objects::enums::payment_statuses::PaymentStatus,
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn insert(&self, payment: InsertPaymentEntity) -> StoreResult<PaymentEntity> {
        run_blocking(&self.db_pool, move |conn| {
            let row = insert_into(payments::table)
                .values(&payment)
                .returning(PaymentEntity::as_returning())
                .get_result::<PaymentEntity>(conn)?;

            Ok(row)
        })
        .await
    }

    async fn find_by_tran_id(&self, tran_id: &str) -> StoreResult<Option<PaymentEntity>> {
        let tran_id = tran_id.to_string();

        run_blocking(&self.db_pool, move |conn| {
            let result = payments::table
                .filter(payments::tran_id.eq(&tran_id))
                .select(PaymentEntity::as_select())
                .first::<PaymentEntity>(conn)
                .optional()?;

            Ok(result)
        })
        .await
    }

    async fn list(&self) -> StoreResult<Vec<PaymentEntity>> {
        run_blocking(&self.db_pool, |conn| {
            let results = payments::table
                .order(payments::created_at.desc())
                .select(PaymentEntity::as_select())
                .load::<PaymentEntity>(conn)?;

            Ok(results)
        })
        .await
    }

    async fn settle(
        &self,
        tran_id: &str,
        settlement: SettlePaymentEntity,
    ) -> StoreResult<Option<PaymentEntity>> {
        let tran_id = tran_id.to_string();

        run_blocking(&self.db_pool, move |conn| {
            let updated = update(payments::table)
                .filter(payments::tran_id.eq(&tran_id))
                .filter(payments::status.eq(PaymentStatus::Initiated.as_str()))
                .set(&settlement)
                .returning(PaymentEntity::as_returning())
                .get_result::<PaymentEntity>(conn)
                .optional()?;

            Ok(updated)
        })
        .await
    }
}
