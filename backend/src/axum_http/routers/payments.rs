use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use hms::{
    domain::{
        repositories::{bookings::BookingRepository, payments::PaymentRepository},
        value_objects::payments::{GatewayCallbackModel, InitPaymentModel},
    },
    notifications::EventPublisher,
};
use serde::Serialize;
use tracing::warn;

use crate::{
    axum_http::error_responses::AppError,
    usecases::payments::{CallbackOutcome, PaymentError, PaymentGateway, PaymentUseCase, UseCaseResult},
};

/// Body returned to the gateway. Callbacks are always answered with 200 so the
/// gateway stops retrying; the outcome is informational.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub tran_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CallbackOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn routes<P, B, G, N>(payments_usecase: PaymentUseCase<P, B, G, N>) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        .route("/init", post(initiate_payment::<P, B, G, N>))
        .route("/success", post(payment_success::<P, B, G, N>))
        .route("/fail", post(payment_fail::<P, B, G, N>))
        .route("/cancel", post(payment_cancel::<P, B, G, N>))
        .route("/get-all", get(list_payments::<P, B, G, N>))
        .with_state(Arc::new(payments_usecase))
}

pub async fn initiate_payment<P, B, G, N>(
    State(payments_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    WithRejection(Json(model), _): WithRejection<Json<InitPaymentModel>, AppError>,
) -> Result<impl IntoResponse, AppError>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let session = payments_usecase.initiate_payment(model).await?;
    Ok(Json(session))
}

pub async fn payment_success<P, B, G, N>(
    State(payments_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    form: Result<Form<GatewayCallbackModel>, FormRejection>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let callback = match form {
        Ok(Form(callback)) => callback,
        Err(rejection) => return malformed_callback("success", rejection),
    };
    let tran_id = callback.tran_id.clone();
    acknowledge(tran_id, payments_usecase.handle_success_callback(callback).await)
}

pub async fn payment_fail<P, B, G, N>(
    State(payments_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    form: Result<Form<GatewayCallbackModel>, FormRejection>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let callback = match form {
        Ok(Form(callback)) => callback,
        Err(rejection) => return malformed_callback("fail", rejection),
    };
    let tran_id = callback.tran_id.clone();
    acknowledge(tran_id, payments_usecase.handle_fail_callback(callback).await)
}

pub async fn payment_cancel<P, B, G, N>(
    State(payments_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    form: Result<Form<GatewayCallbackModel>, FormRejection>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let callback = match form {
        Ok(Form(callback)) => callback,
        Err(rejection) => return malformed_callback("cancel", rejection),
    };
    let tran_id = callback.tran_id.clone();
    acknowledge(tran_id, payments_usecase.handle_cancel_callback(callback).await)
}

pub async fn list_payments<P, B, G, N>(
    State(payments_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
) -> Result<impl IntoResponse, AppError>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    let payments = payments_usecase.get_all().await?;
    Ok(Json(payments))
}

fn acknowledge(tran_id: String, result: UseCaseResult<CallbackOutcome>) -> (StatusCode, Json<CallbackAck>) {
    let ack = match result {
        Ok(outcome) => CallbackAck {
            tran_id,
            outcome: Some(outcome),
            error: None,
        },
        Err(err) => {
            let error = match err {
                PaymentError::Internal(_) => "internal error".to_string(),
                other => other.to_string(),
            };
            CallbackAck {
                tran_id,
                outcome: None,
                error: Some(error),
            }
        }
    };
    (StatusCode::OK, Json(ack))
}

fn malformed_callback(callback: &str, rejection: FormRejection) -> (StatusCode, Json<CallbackAck>) {
    warn!(callback, rejection = %rejection.body_text(), "payments: malformed gateway callback");
    (
        StatusCode::OK,
        Json(CallbackAck {
            tran_id: String::new(),
            outcome: None,
            error: Some("malformed callback".to_string()),
        }),
    )
}
