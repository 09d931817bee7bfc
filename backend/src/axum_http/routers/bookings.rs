use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use axum_extra::extract::WithRejection;
use hms::{
    domain::{
        repositories::{bookings::BookingRepository, catalog::CatalogRepository},
        value_objects::bookings::{CreateBookingModel, UpdateBookingStatusModel},
    },
    notifications::EventPublisher,
};
use serde_json::json;
use uuid::Uuid;

use crate::{axum_http::error_responses::AppError, usecases::bookings::BookingUseCase};

pub fn routes<B, C, N>(bookings_usecase: BookingUseCase<B, C, N>) -> Router
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/create", post(create_booking::<B, C, N>))
        .route("/get/:id", get(get_booking::<B, C, N>))
        .route("/get-all", get(list_bookings::<B, C, N>))
        .route("/:id/status", put(update_booking_status::<B, C, N>))
        .route("/delete/:id", delete(delete_booking::<B, C, N>))
        .with_state(Arc::new(bookings_usecase))
}

pub async fn create_booking<B, C, N>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, C, N>>>,
    WithRejection(Json(model), _): WithRejection<Json<CreateBookingModel>, AppError>,
) -> Result<impl IntoResponse, AppError>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let booking = bookings_usecase.create_booking(model).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn get_booking<B, C, N>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, C, N>>>,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let booking = bookings_usecase.get_by_id(booking_id).await?;
    Ok(Json(booking))
}

pub async fn list_bookings<B, C, N>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, C, N>>>,
) -> Result<impl IntoResponse, AppError>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let bookings = bookings_usecase.get_all().await?;
    Ok(Json(bookings))
}

pub async fn update_booking_status<B, C, N>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, C, N>>>,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(model), _): WithRejection<Json<UpdateBookingStatusModel>, AppError>,
) -> Result<impl IntoResponse, AppError>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let booking = bookings_usecase.update_status(booking_id, model).await?;
    Ok(Json(booking))
}

pub async fn delete_booking<B, C, N>(
    State(bookings_usecase): State<Arc<BookingUseCase<B, C, N>>>,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError>
where
    B: BookingRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    bookings_usecase.delete(booking_id).await?;
    Ok(Json(json!({ "id": booking_id, "deleted": true })))
}
