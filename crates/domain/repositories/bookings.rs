use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity},
    errors::StoreResult,
    value_objects::{bookings::ServiceDayQueue, enums::booking_statuses::BookingStatus},
};

/// Persistence for bookings. Soft-deleted rows are invisible to every read.
#[automock]
#[async_trait]
pub trait BookingRepository {
    /// Fails with `StoreError::Conflict` when the row would overlap an active
    /// booking of the same room, or reuse a serial number for the same
    /// service day.
    async fn insert(&self, booking: InsertBookingEntity) -> StoreResult<BookingEntity>;

    async fn find_by_id(&self, booking_id: Uuid) -> StoreResult<Option<BookingEntity>>;

    /// Newest first.
    async fn list(&self) -> StoreResult<Vec<BookingEntity>>;

    /// Half-open test against non-canceled bookings of the room:
    /// `existing.check_in < check_out AND existing.check_out > check_in`.
    async fn has_room_overlap(
        &self,
        room_id: Uuid,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn service_day_queue(&self, service_id: Uuid, day: NaiveDate)
    -> StoreResult<ServiceDayQueue>;

    /// Compare-and-set on status. Returns `None` when the booking is absent or
    /// its status is no longer `from`.
    async fn transition_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<BookingEntity>>;

    /// Returns false when there was no live booking to delete.
    async fn soft_delete(&self, booking_id: Uuid) -> StoreResult<bool>;
}
