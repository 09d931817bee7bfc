use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity},
    errors::{StoreError, StoreResult},
    repositories::bookings::BookingRepository,
    value_objects::{bookings::ServiceDayQueue, enums::booking_statuses::BookingStatus},
};

#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<Uuid, BookingEntity>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, soft-deleted ones included.
    pub async fn snapshot(&self) -> Vec<BookingEntity> {
        self.bookings.read().await.values().cloned().collect()
    }
}

fn overlaps(
    existing: &BookingEntity,
    room_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> bool {
    if !existing.holds_room() || existing.room_id != Some(room_id) {
        return false;
    }
    match (existing.check_in_date, existing.check_out_date) {
        (Some(start), Some(end)) => start < check_out && end > check_in,
        _ => false,
    }
}

fn same_service_day(existing: &BookingEntity, service_id: Uuid, day: NaiveDate) -> bool {
    !existing.is_deleted
        && existing.service_id == Some(service_id)
        && existing.scheduled_day == Some(day)
}

#[async_trait]
impl BookingRepository for InMemoryBookingStore {
    async fn insert(&self, booking: InsertBookingEntity) -> StoreResult<BookingEntity> {
        let mut rows = self.bookings.write().await;

        if rows.contains_key(&booking.id) {
            return Err(StoreError::Conflict(format!(
                "booking {} already exists",
                booking.id
            )));
        }

        if let (Some(room_id), Some(check_in), Some(check_out)) =
            (booking.room_id, booking.check_in_date, booking.check_out_date)
        {
            let canceled = booking.status == BookingStatus::Canceled.as_str();
            if !canceled && rows.values().any(|b| overlaps(b, room_id, check_in, check_out)) {
                return Err(StoreError::Conflict(format!(
                    "room {room_id} is already booked for the requested interval"
                )));
            }
        }

        if let (Some(service_id), Some(day), Some(serial)) =
            (booking.service_id, booking.scheduled_day, booking.serial_number)
        {
            let taken = rows
                .values()
                .any(|b| same_service_day(b, service_id, day) && b.serial_number == Some(serial));
            if taken {
                return Err(StoreError::Conflict(format!(
                    "serial {serial} already issued for service {service_id} on {day}"
                )));
            }
        }

        let entity = BookingEntity::from(booking);
        rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, booking_id: Uuid) -> StoreResult<Option<BookingEntity>> {
        let rows = self.bookings.read().await;
        Ok(rows.get(&booking_id).filter(|b| !b.is_deleted).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<BookingEntity>> {
        let rows = self.bookings.read().await;
        let mut live: Vec<BookingEntity> = rows.values().filter(|b| !b.is_deleted).cloned().collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(live)
    }

    async fn has_room_overlap(
        &self,
        room_id: Uuid,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let rows = self.bookings.read().await;
        Ok(rows.values().any(|b| overlaps(b, room_id, check_in, check_out)))
    }

    async fn service_day_queue(
        &self,
        service_id: Uuid,
        day: NaiveDate,
    ) -> StoreResult<ServiceDayQueue> {
        let rows = self.bookings.read().await;
        let mut queue = ServiceDayQueue::default();
        for booking in rows.values().filter(|b| same_service_day(b, service_id, day)) {
            queue.taken += 1;
            queue.highest_serial = queue.highest_serial.max(booking.serial_number);
        }
        Ok(queue)
    }

    async fn transition_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<BookingEntity>> {
        let mut rows = self.bookings.write().await;
        let Some(booking) = rows.get_mut(&booking_id) else {
            return Ok(None);
        };
        if booking.is_deleted || booking.status != from.as_str() {
            return Ok(None);
        }
        booking.status = to.to_string();
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn soft_delete(&self, booking_id: Uuid) -> StoreResult<bool> {
        let mut rows = self.bookings.write().await;
        match rows.get_mut(&booking_id) {
            Some(booking) if !booking.is_deleted => {
                booking.is_deleted = true;
                booking.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
