use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::usecases::{bookings::BookingError, payments::PaymentError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(_) => {
                // Don't leak internal error detail to client
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(value: BookingError) -> Self {
        let message = value.to_string();
        match value {
            BookingError::InvalidRequest(_) => AppError::BadRequest(message),
            BookingError::NotFound(_) => AppError::NotFound(message),
            BookingError::Conflict(_) => AppError::Conflict(message),
            BookingError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(value: PaymentError) -> Self {
        let message = value.to_string();
        match value {
            PaymentError::InvalidState(_) => AppError::BadRequest(message),
            PaymentError::NotFound(_) => AppError::NotFound(message),
            PaymentError::Conflict(_) => AppError::Conflict(message),
            PaymentError::Gateway(_) => AppError::BadGateway(message),
            PaymentError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use hms::domain::errors::StoreError;

    #[test]
    fn use_case_errors_keep_their_status() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (
                BookingError::InvalidRequest("room_id is required".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (BookingError::NotFound("room").into(), StatusCode::NOT_FOUND),
            (BookingError::Conflict("taken".into()).into(), StatusCode::CONFLICT),
            (
                PaymentError::InvalidState("no price".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (PaymentError::Gateway("timed out".into()).into(), StatusCode::BAD_GATEWAY),
            (
                PaymentError::Internal(anyhow!("pool exhausted")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn status_codes_agree_with_use_case_errors() {
        let booking = BookingError::Conflict("taken".into());
        let expected = booking.status_code();
        assert_eq!(AppError::from(booking).into_response().status(), expected);

        let payment = PaymentError::NotFound("payment");
        let expected = payment.status_code();
        assert_eq!(AppError::from(payment).into_response().status(), expected);
    }

    #[tokio::test]
    async fn constraint_names_never_reach_the_body() {
        let store_errors = [
            "duplicate key value violates unique constraint \"payments_tran_id_key\"",
            "conflicting key value violates exclusion constraint \"bookings_room_no_overlap\"",
        ];

        for detail in store_errors {
            let responses = [
                AppError::from(PaymentError::from(StoreError::Conflict(detail.to_string())))
                    .into_response(),
                AppError::from(BookingError::from(StoreError::Conflict(detail.to_string())))
                    .into_response(),
            ];
            for response in responses {
                assert_eq!(response.status(), StatusCode::CONFLICT);
                let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                let body = String::from_utf8(body.to_vec()).unwrap();
                assert!(!body.contains("constraint"), "{body}");
                assert!(!body.contains("payments_"), "{body}");
                assert!(!body.contains("bookings_"), "{body}");
            }
        }
    }
}
