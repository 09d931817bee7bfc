use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::payment_statuses::PaymentStatus,
    infra::db::postgres::schema::payments,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub tran_id: String,
    pub amount: Decimal,
    pub status: String,
    pub method: Option<String>,
    pub bank_tran_id: Option<String>,
    pub validation_id: Option<String>,
    pub transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub tran_id: String,
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InsertPaymentEntity> for PaymentEntity {
    fn from(value: InsertPaymentEntity) -> Self {
        Self {
            id: value.id,
            booking_id: value.booking_id,
            tran_id: value.tran_id,
            amount: value.amount,
            status: value.status,
            method: None,
            bank_tran_id: None,
            validation_id: None,
            transaction_at: None,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Terminal write applied to an `initiated` payment by a gateway callback.
/// `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = payments)]
pub struct SettlePaymentEntity {
    pub status: String,
    pub method: Option<String>,
    pub bank_tran_id: Option<String>,
    pub validation_id: Option<String>,
    pub transaction_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SettlePaymentEntity {
    pub fn apply_to(&self, payment: &mut PaymentEntity) {
        payment.status = self.status.clone();
        if let Some(method) = &self.method {
            payment.method = Some(method.clone());
        }
        if let Some(bank_tran_id) = &self.bank_tran_id {
            payment.bank_tran_id = Some(bank_tran_id.clone());
        }
        if let Some(validation_id) = &self.validation_id {
            payment.validation_id = Some(validation_id.clone());
        }
        if let Some(transaction_at) = self.transaction_at {
            payment.transaction_at = Some(transaction_at);
        }
        payment.updated_at = self.updated_at;
    }
}
