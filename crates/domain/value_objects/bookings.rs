use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::bookings::BookingEntity,
    value_objects::enums::{booking_statuses::BookingStatus, booking_types::BookingType},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateBookingModel {
    pub booking_type: BookingType,
    pub patient_id: Uuid,
    #[serde(default)]
    pub room_id: Option<Uuid>,
    #[serde(default)]
    pub check_in_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub check_out_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UpdateBookingStatusModel {
    pub status: BookingStatus,
}

/// Live bookings already holding a ticket for one service on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceDayQueue {
    pub taken: i64,
    pub highest_serial: Option<i32>,
}

impl ServiceDayQueue {
    /// `taken + 1`, pushed past the highest live ticket when a soft delete has
    /// left a hole in the sequence.
    pub fn next_serial(&self) -> i32 {
        let by_count = i32::try_from(self.taken).unwrap_or(i32::MAX - 1);
        by_count.max(self.highest_serial.unwrap_or(0)) + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDto {
    pub id: Uuid,
    pub booking_type: BookingType,
    pub status: BookingStatus,
    pub patient_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub total_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<i32>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingEntity> for BookingDto {
    type Error = anyhow::Error;

    fn try_from(value: BookingEntity) -> Result<Self, Self::Error> {
        let booking_type = value
            .kind()
            .ok_or_else(|| anyhow!("unknown booking_type {:?}", value.booking_type))?;
        let status = value
            .booking_status()
            .ok_or_else(|| anyhow!("unknown booking status {:?}", value.status))?;

        Ok(Self {
            id: value.id,
            booking_type,
            status,
            patient_id: value.patient_id,
            room_id: value.room_id,
            check_in_date: value.check_in_date,
            check_out_date: value.check_out_date,
            total_price: value.total_price,
            service_id: value.service_id,
            scheduled_at: value.scheduled_at,
            serial_number: value.serial_number,
            is_deleted: value.is_deleted,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_serial_follows_count() {
        let queue = ServiceDayQueue {
            taken: 2,
            highest_serial: Some(2),
        };
        assert_eq!(queue.next_serial(), 3);
        assert_eq!(ServiceDayQueue::default().next_serial(), 1);
    }

    #[test]
    fn next_serial_skips_past_hole_left_by_delete() {
        // tickets 1 and 3 survive after 2 was deleted
        let queue = ServiceDayQueue {
            taken: 2,
            highest_serial: Some(3),
        };
        assert_eq!(queue.next_serial(), 4);
    }

    #[test]
    fn create_model_accepts_numeric_price_and_omitted_fields() {
        let json = r#"{
            "booking_type": "service",
            "patient_id": "6f1c1a2e-4c1b-4b9a-9d55-0b1f7c2d9e10",
            "service_id": "0d3c6b8e-1a7f-4f4e-8d1e-6a2b3c4d5e6f",
            "scheduled_at": "2024-01-10T09:30:00Z",
            "total_price": 450.5
        }"#;
        let model: CreateBookingModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.booking_type, BookingType::Service);
        assert_eq!(model.total_price, Some(Decimal::new(4505, 1)));
        assert!(model.room_id.is_none());
        assert!(model.check_in_date.is_none());
    }
}
