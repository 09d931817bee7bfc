use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use hms::{
    domain::{
        entities::bookings::{BookingEntity, InsertBookingEntity},
        errors::StoreError,
        repositories::{bookings::BookingRepository, catalog::CatalogRepository},
        value_objects::{
            bookings::{BookingDto, CreateBookingModel, UpdateBookingStatusModel},
            enums::{booking_statuses::BookingStatus, booking_types::BookingType},
        },
    },
    notifications::{DomainEvent, EventPublisher},
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Serial assignment is read-then-insert; a unique index rejects the loser of
/// a race, which recomputes and tries again.
pub const MAX_SERIAL_ATTEMPTS: usize = 8;
const MAX_STATUS_ATTEMPTS: usize = 3;
const SECONDS_PER_NIGHT: i64 = 86_400;
const STORE_CONFLICT_MESSAGE: &str = "booking conflicts with an existing booking";
const ROOM_TAKEN_MESSAGE: &str = "room is already booked for the requested dates";
/// Prices are stored as `NUMERIC(10, 2)`.
const PRICE_SCALE: u32 = 2;
const PRICE_LIMIT: i64 = 100_000_000;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Driver text names tables and constraints; it stays in the log.
impl From<StoreError> for BookingError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(detail) => {
                warn!(store_detail = %detail, "bookings: write rejected by a storage constraint");
                BookingError::Conflict(STORE_CONFLICT_MESSAGE.to_string())
            }
            StoreError::Internal(err) => BookingError::Internal(err),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BookingError>;

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> BookingError {
    move |err| {
        if let StoreError::Internal(_) = &err {
            error!(db_error = ?err, "bookings: {}", context);
        }
        BookingError::from(err)
    }
}

/// Rejects prices the booking store cannot hold exactly.
pub fn check_price(price: Decimal) -> UseCaseResult<Decimal> {
    if price < Decimal::ZERO {
        return Err(BookingError::InvalidRequest(
            "total_price must not be negative".to_string(),
        ));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(BookingError::InvalidRequest(format!(
            "total_price must have at most {PRICE_SCALE} decimal places"
        )));
    }
    if price >= Decimal::from(PRICE_LIMIT) {
        return Err(BookingError::InvalidRequest(format!(
            "total_price must be below {PRICE_LIMIT}"
        )));
    }
    Ok(price)
}

/// Nights between check-in and check-out, rounded up, never below one.
pub fn nights_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    let seconds = (check_out - check_in).num_seconds();
    ((seconds + SECONDS_PER_NIGHT - 1) / SECONDS_PER_NIGHT).max(1)
}

pub struct BookingUseCase<B, C, N>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    booking_repo: Arc<B>,
    catalog_repo: Arc<C>,
    publisher: Arc<N>,
}

impl<B, C, N> BookingUseCase<B, C, N>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    pub fn new(booking_repo: Arc<B>, catalog_repo: Arc<C>, publisher: Arc<N>) -> Self {
        Self {
            booking_repo,
            catalog_repo,
            publisher,
        }
    }

    pub async fn create_booking(&self, model: CreateBookingModel) -> UseCaseResult<BookingDto> {
        info!(
            booking_type = %model.booking_type,
            patient_id = %model.patient_id,
            "bookings: create requested"
        );

        if let Some(price) = model.total_price {
            check_price(price)?;
        }

        self.catalog_repo
            .find_patient(model.patient_id)
            .await
            .map_err(store_failure("failed to resolve patient"))?
            .ok_or(BookingError::NotFound("patient"))?;

        let booking = match model.booking_type {
            BookingType::Room => self.create_room_booking(&model).await?,
            BookingType::Service => self.create_service_booking(&model).await?,
        };

        info!(
            booking_id = %booking.id,
            booking_type = %booking.booking_type,
            serial_number = ?booking.serial_number,
            "bookings: created"
        );

        self.publisher.publish(DomainEvent::BookingCreated {
            booking_id: booking.id,
            booking_type: model.booking_type,
            patient_id: booking.patient_id,
            serial_number: booking.serial_number,
            at: booking.created_at,
        });

        to_dto(booking)
    }

    async fn create_room_booking(&self, model: &CreateBookingModel) -> UseCaseResult<BookingEntity> {
        let room_id = model.room_id.ok_or_else(|| {
            BookingError::InvalidRequest("room_id is required for room bookings".to_string())
        })?;
        let (check_in, check_out) = match (model.check_in_date, model.check_out_date) {
            (Some(check_in), Some(check_out)) => (check_in, check_out),
            _ => {
                return Err(BookingError::InvalidRequest(
                    "check_in_date and check_out_date are required for room bookings".to_string(),
                ));
            }
        };
        if check_in >= check_out {
            return Err(BookingError::InvalidRequest(
                "check_in_date must be before check_out_date".to_string(),
            ));
        }

        let room = self
            .catalog_repo
            .find_room(room_id)
            .await
            .map_err(store_failure("failed to resolve room"))?
            .ok_or(BookingError::NotFound("room"))?;

        if !room.availability {
            warn!(%room_id, "bookings: room is flagged unavailable");
            return Err(BookingError::Conflict("room is not available".to_string()));
        }

        let overlapping = self
            .booking_repo
            .has_room_overlap(room_id, check_in, check_out)
            .await
            .map_err(store_failure("failed to check room overlap"))?;
        if overlapping {
            info!(%room_id, %check_in, %check_out, "bookings: interval overlaps existing booking");
            return Err(BookingError::Conflict(ROOM_TAKEN_MESSAGE.to_string()));
        }

        let total_price = match model.total_price {
            Some(price) => price,
            None => {
                let nights = nights_between(check_in, check_out);
                let derived = room
                    .price_per_day
                    .checked_mul(Decimal::from(nights))
                    .ok_or_else(|| {
                        BookingError::InvalidRequest("stay is too long to price".to_string())
                    })?;
                check_price(derived).inspect_err(|_| {
                    warn!(%room_id, nights, %derived, "bookings: derived price out of range");
                })?
            }
        };

        let mut booking = new_booking(BookingType::Room, model.patient_id, total_price);
        booking.room_id = Some(room_id);
        booking.check_in_date = Some(check_in);
        booking.check_out_date = Some(check_out);

        // The store re-checks under its own lock or constraint.
        match self.booking_repo.insert(booking).await {
            Ok(created) => Ok(created),
            Err(StoreError::Conflict(detail)) => {
                info!(
                    %room_id,
                    store_detail = %detail,
                    "bookings: interval taken by a concurrent booking"
                );
                Err(BookingError::Conflict(ROOM_TAKEN_MESSAGE.to_string()))
            }
            Err(err) => Err(store_failure("failed to insert room booking")(err)),
        }
    }

    async fn create_service_booking(
        &self,
        model: &CreateBookingModel,
    ) -> UseCaseResult<BookingEntity> {
        let service_id = model.service_id.ok_or_else(|| {
            BookingError::InvalidRequest("service_id is required for service bookings".to_string())
        })?;
        let scheduled_at = model.scheduled_at.ok_or_else(|| {
            BookingError::InvalidRequest(
                "scheduled_at is required for service bookings".to_string(),
            )
        })?;

        let service = self
            .catalog_repo
            .find_service(service_id)
            .await
            .map_err(store_failure("failed to resolve service"))?
            .ok_or(BookingError::NotFound("service"))?;

        let day = scheduled_at.date_naive();
        let total_price = model.total_price.unwrap_or(service.price);

        for attempt in 1..=MAX_SERIAL_ATTEMPTS {
            let queue = self
                .booking_repo
                .service_day_queue(service_id, day)
                .await
                .map_err(store_failure("failed to read service day queue"))?;
            let serial_number = queue.next_serial();

            let mut booking = new_booking(BookingType::Service, model.patient_id, total_price);
            booking.service_id = Some(service_id);
            booking.scheduled_at = Some(scheduled_at);
            booking.scheduled_day = Some(day);
            booking.serial_number = Some(serial_number);

            match self.booking_repo.insert(booking).await {
                Ok(created) => return Ok(created),
                Err(StoreError::Conflict(reason)) => {
                    info!(
                        %service_id,
                        %day,
                        serial_number,
                        attempt,
                        reason = %reason,
                        "bookings: serial taken concurrently; recomputing"
                    );
                }
                Err(err) => return Err(store_failure("failed to insert service booking")(err)),
            }
        }

        warn!(%service_id, %day, "bookings: serial assignment kept colliding");
        Err(BookingError::Conflict(
            "could not assign a serial number; please retry".to_string(),
        ))
    }

    pub async fn get_by_id(&self, booking_id: Uuid) -> UseCaseResult<BookingDto> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(store_failure("failed to load booking"))?
            .ok_or(BookingError::NotFound("booking"))?;
        to_dto(booking)
    }

    pub async fn get_all(&self) -> UseCaseResult<Vec<BookingDto>> {
        let bookings = self
            .booking_repo
            .list()
            .await
            .map_err(store_failure("failed to list bookings"))?;
        let booking_count = bookings.len();
        info!(booking_count, "bookings: listed");
        bookings.into_iter().map(to_dto).collect()
    }

    /// Moves a booking along the transition table. Re-applying the current
    /// status is a no-op.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        model: UpdateBookingStatusModel,
    ) -> UseCaseResult<BookingDto> {
        let target = model.status;

        for _ in 0..MAX_STATUS_ATTEMPTS {
            let booking = self
                .booking_repo
                .find_by_id(booking_id)
                .await
                .map_err(store_failure("failed to load booking"))?
                .ok_or(BookingError::NotFound("booking"))?;
            let current = booking.booking_status().ok_or_else(|| {
                BookingError::Internal(anyhow!(
                    "booking {booking_id} has unknown status {}",
                    booking.status
                ))
            })?;

            if current == target {
                info!(%booking_id, status = %target, "bookings: status unchanged");
                return to_dto(booking);
            }
            if !current.can_transition_to(target) {
                warn!(%booking_id, from = %current, to = %target, "bookings: illegal transition");
                return Err(BookingError::Conflict(format!(
                    "cannot move booking from {current} to {target}"
                )));
            }

            let updated = self
                .booking_repo
                .transition_status(booking_id, current, target)
                .await
                .map_err(store_failure("failed to update booking status"))?;

            if let Some(updated) = updated {
                info!(%booking_id, from = %current, to = %target, "bookings: status changed");
                self.publisher.publish(DomainEvent::BookingStatusChanged {
                    booking_id,
                    from: current,
                    to: target,
                    at: updated.updated_at,
                });
                return to_dto(updated);
            }
            // Status moved underneath us; re-read and re-judge.
        }

        Err(BookingError::Conflict(
            "booking status is changing concurrently; please retry".to_string(),
        ))
    }

    pub async fn delete(&self, booking_id: Uuid) -> UseCaseResult<()> {
        let deleted = self
            .booking_repo
            .soft_delete(booking_id)
            .await
            .map_err(store_failure("failed to delete booking"))?;
        if !deleted {
            return Err(BookingError::NotFound("booking"));
        }
        info!(%booking_id, "bookings: soft deleted");
        Ok(())
    }
}

fn new_booking(kind: BookingType, patient_id: Uuid, total_price: Decimal) -> InsertBookingEntity {
    let now = Utc::now();
    InsertBookingEntity {
        id: Uuid::new_v4(),
        booking_type: kind.to_string(),
        patient_id,
        status: BookingStatus::Pending.to_string(),
        room_id: None,
        check_in_date: None,
        check_out_date: None,
        service_id: None,
        scheduled_at: None,
        scheduled_day: None,
        serial_number: None,
        total_price: Some(total_price),
        is_deleted: false,
        created_at: now,
        updated_at: now,
    }
}

fn to_dto(booking: BookingEntity) -> UseCaseResult<BookingDto> {
    BookingDto::try_from(booking).map_err(|err| {
        error!(error = ?err, "bookings: stored row could not be decoded");
        BookingError::Internal(err)
    })
}
