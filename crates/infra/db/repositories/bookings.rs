use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    PgConnection, QueryResult,
    dsl::{count_star, exists, max},
    insert_into,
    prelude::*,
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use super::run_blocking;
use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{bookings, rooms},
    },
};
use domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity},
    errors::{StoreError, StoreResult},
    repositories::bookings::BookingRepository,
    value_objects::{bookings::ServiceDayQueue, enums::booking_statuses::BookingStatus},
};

pub struct BookingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BookingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn room_overlap_exists(
    conn: &mut PgConnection,
    room_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> QueryResult<bool> {
    diesel::select(exists(
        bookings::table
            .filter(bookings::room_id.eq(room_id))
            .filter(bookings::is_deleted.eq(false))
            .filter(bookings::status.ne(BookingStatus::Canceled.as_str()))
            .filter(bookings::check_in_date.lt(check_out))
            .filter(bookings::check_out_date.gt(check_in)),
    ))
    .get_result(conn)
}

#[async_trait]
impl BookingRepository for BookingPostgres {
    async fn insert(&self, booking: InsertBookingEntity) -> StoreResult<BookingEntity> {
        run_blocking(&self.db_pool, move |conn| {
            conn.transaction::<BookingEntity, StoreError, _>(|tx| {
                // Writers for one room queue on its catalog row, so the re-check
                // below sees every committed interval. The exclusion constraint
                // backs this up.
                if let (Some(room_id), Some(check_in), Some(check_out)) =
                    (booking.room_id, booking.check_in_date, booking.check_out_date)
                {
                    rooms::table
                        .filter(rooms::id.eq(room_id))
                        .select(rooms::id)
                        .for_update()
                        .first::<Uuid>(tx)
                        .optional()?;

                    if room_overlap_exists(tx, room_id, check_in, check_out)? {
                        return Err(StoreError::Conflict(format!(
                            "room {room_id} is already booked for the requested interval"
                        )));
                    }
                }

                let row = insert_into(bookings::table)
                    .values(&booking)
                    .returning(BookingEntity::as_returning())
                    .get_result::<BookingEntity>(tx)?;

                Ok(row)
            })
        })
        .await
    }

    async fn find_by_id(&self, booking_id: Uuid) -> StoreResult<Option<BookingEntity>> {
        run_blocking(&self.db_pool, move |conn| {
            let result = bookings::table
                .filter(bookings::id.eq(booking_id))
                .filter(bookings::is_deleted.eq(false))
                .select(BookingEntity::as_select())
                .first::<BookingEntity>(conn)
                .optional()?;

            Ok(result)
        })
        .await
    }

    async fn list(&self) -> StoreResult<Vec<BookingEntity>> {
        run_blocking(&self.db_pool, |conn| {
            let results = bookings::table
                .filter(bookings::is_deleted.eq(false))
                .order(bookings::created_at.desc())
                .select(BookingEntity::as_select())
                .load::<BookingEntity>(conn)?;

            Ok(results)
        })
        .await
    }

    async fn has_room_overlap(
        &self,
        room_id: Uuid,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> StoreResult<bool> {
        run_blocking(&self.db_pool, move |conn| {
            Ok(room_overlap_exists(conn, room_id, check_in, check_out)?)
        })
        .await
    }

    async fn service_day_queue(
        &self,
        service_id: Uuid,
        day: NaiveDate,
    ) -> StoreResult<ServiceDayQueue> {
        run_blocking(&self.db_pool, move |conn| {
            let (taken, highest_serial) = bookings::table
                .filter(bookings::service_id.eq(service_id))
                .filter(bookings::scheduled_day.eq(day))
                .filter(bookings::is_deleted.eq(false))
                .select((count_star(), max(bookings::serial_number)))
                .first::<(i64, Option<i32>)>(conn)?;

            Ok(ServiceDayQueue {
                taken,
                highest_serial,
            })
        })
        .await
    }

    async fn transition_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<Option<BookingEntity>> {
        let now = Utc::now();

        run_blocking(&self.db_pool, move |conn| {
            let updated = update(bookings::table)
                .filter(bookings::id.eq(booking_id))
                .filter(bookings::is_deleted.eq(false))
                .filter(bookings::status.eq(from.as_str()))
                .set((bookings::status.eq(to.as_str()), bookings::updated_at.eq(now)))
                .returning(BookingEntity::as_returning())
                .get_result::<BookingEntity>(conn)
                .optional()?;

            Ok(updated)
        })
        .await
    }

    async fn soft_delete(&self, booking_id: Uuid) -> StoreResult<bool> {
        let now = Utc::now();

        run_blocking(&self.db_pool, move |conn| {
            let affected = update(bookings::table)
                .filter(bookings::id.eq(booking_id))
                .filter(bookings::is_deleted.eq(false))
                .set((bookings::is_deleted.eq(true), bookings::updated_at.eq(now)))
                .execute(conn)?;

            Ok(affected > 0)
        })
        .await
    }
}
