use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payments::PaymentEntity, value_objects::enums::payment_statuses::PaymentStatus,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InitPaymentModel {
    pub booking_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitPaymentDto {
    pub redirect_url: String,
    pub tran_id: String,
}

/// Form body posted by the gateway to the success/fail/cancel callbacks.
/// Every field is optional on the wire; the handlers decide what they need.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GatewayCallbackModel {
    #[serde(default)]
    pub tran_id: String,
    #[serde(default)]
    pub bank_tran_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub store_amount: Option<String>,
    #[serde(default)]
    pub val_id: Option<String>,
    #[serde(default)]
    pub tran_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentDto {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub tran_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_tran_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentEntity> for PaymentDto {
    type Error = anyhow::Error;

    fn try_from(value: PaymentEntity) -> Result<Self, Self::Error> {
        let status = value
            .payment_status()
            .ok_or_else(|| anyhow!("unknown payment status {:?}", value.status))?;

        Ok(Self {
            id: value.id,
            booking_id: value.booking_id,
            tran_id: value.tran_id,
            amount: value.amount,
            status,
            method: value.method,
            bank_tran_id: value.bank_tran_id,
            validation_id: value.validation_id,
            transaction_at: value.transaction_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
