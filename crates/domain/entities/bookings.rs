use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::{booking_statuses::BookingStatus, booking_types::BookingType},
    infra::db::postgres::schema::bookings,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = bookings)]
pub struct BookingEntity {
    pub id: Uuid,
    pub booking_type: String,
    pub patient_id: Uuid,
    pub status: String,
    pub room_id: Option<Uuid>,
    pub check_in_date: Option<DateTime<Utc>>,
    pub check_out_date: Option<DateTime<Utc>>,
    pub service_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub scheduled_day: Option<NaiveDate>,
    pub serial_number: Option<i32>,
    pub total_price: Option<Decimal>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingEntity {
    pub fn kind(&self) -> Option<BookingType> {
        self.booking_type.parse().ok()
    }

    pub fn booking_status(&self) -> Option<BookingStatus> {
        self.status.parse().ok()
    }

    /// True when this row takes part in room-overlap checks.
    pub fn holds_room(&self) -> bool {
        !self.is_deleted
            && self.room_id.is_some()
            && self.booking_status() != Some(BookingStatus::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = bookings)]
pub struct InsertBookingEntity {
    pub id: Uuid,
    pub booking_type: String,
    pub patient_id: Uuid,
    pub status: String,
    pub room_id: Option<Uuid>,
    pub check_in_date: Option<DateTime<Utc>>,
    pub check_out_date: Option<DateTime<Utc>>,
    pub service_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub scheduled_day: Option<NaiveDate>,
    pub serial_number: Option<i32>,
    pub total_price: Option<Decimal>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InsertBookingEntity> for BookingEntity {
    fn from(value: InsertBookingEntity) -> Self {
        Self {
            id: value.id,
            booking_type: value.booking_type,
            patient_id: value.patient_id,
            status: value.status,
            room_id: value.room_id,
            check_in_date: value.check_in_date,
            check_out_date: value.check_out_date,
            service_id: value.service_id,
            scheduled_at: value.scheduled_at,
            scheduled_day: value.scheduled_day,
            serial_number: value.serial_number,
            total_price: value.total_price,
            is_deleted: value.is_deleted,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
