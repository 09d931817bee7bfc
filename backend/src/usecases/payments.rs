use std::{sync::Arc, time::Duration};

use anyhow::{Result as AnyResult, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use hms::{
    domain::{
        entities::payments::{InsertPaymentEntity, PaymentEntity, SettlePaymentEntity},
        errors::StoreError,
        repositories::{bookings::BookingRepository, payments::PaymentRepository},
        value_objects::{
            enums::{booking_statuses::BookingStatus, payment_statuses::PaymentStatus},
            payments::{GatewayCallbackModel, InitPaymentDto, InitPaymentModel, PaymentDto},
        },
    },
    notifications::{DomainEvent, EventPublisher},
    payments::sslcommerz_client::SslCommerzClient,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Format of `tran_date` in gateway callbacks.
pub const GATEWAY_TRAN_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the hosted checkout URL for a new session.
    async fn create_session(&self, tran_id: &str, amount: Decimal) -> AnyResult<String>;
}

#[async_trait]
impl PaymentGateway for SslCommerzClient {
    async fn create_session(&self, tran_id: &str, amount: Decimal) -> AnyResult<String> {
        self.create_session(tran_id, amount).await
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Gateway(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::InvalidState(_) => StatusCode::BAD_REQUEST,
            PaymentError::Conflict(_) => StatusCode::CONFLICT,
            PaymentError::Gateway(_) => StatusCode::BAD_GATEWAY,
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Driver text names tables and constraints; it stays in the log.
impl From<StoreError> for PaymentError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(detail) => {
                warn!(store_detail = %detail, "payments: write rejected by a storage constraint");
                PaymentError::Conflict("duplicate transaction; please retry".to_string())
            }
            StoreError::Internal(err) => PaymentError::Internal(err),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> PaymentError {
    move |err| {
        if let StoreError::Internal(_) = &err {
            error!(db_error = ?err, "payments: {}", context);
        }
        PaymentError::from(err)
    }
}

/// What a gateway callback did to the payment it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The payment left `initiated` because of this callback.
    Applied,
    /// The payment already carried this outcome.
    AlreadyApplied,
    /// Unknown tran_id, or the payment already settled the other way.
    Ignored,
}

/// Parses the gateway's `tran_date`. The gateway sends no zone; it is read as UTC.
pub fn parse_tran_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), GATEWAY_TRAN_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub struct PaymentUseCase<P, B, G, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    booking_repo: Arc<B>,
    gateway: Arc<G>,
    publisher: Arc<N>,
    gateway_timeout: Duration,
}

impl<P, B, G, N> PaymentUseCase<P, B, G, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: EventPublisher + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        booking_repo: Arc<B>,
        gateway: Arc<G>,
        publisher: Arc<N>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            payment_repo,
            booking_repo,
            gateway,
            publisher,
            gateway_timeout,
        }
    }

    /// Records an `initiated` payment, then opens a gateway session for it.
    /// A gateway failure leaves the payment row behind; retrying creates a
    /// new one under a fresh tran_id.
    pub async fn initiate_payment(&self, model: InitPaymentModel) -> UseCaseResult<InitPaymentDto> {
        let booking_id = model.booking_id;
        info!(%booking_id, "payments: initiate requested");

        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(store_failure("failed to load booking"))?
            .ok_or(PaymentError::NotFound("booking"))?;

        let amount = booking.total_price.ok_or_else(|| {
            PaymentError::InvalidState("booking has no total price".to_string())
        })?;

        let status = booking.booking_status();
        if status != Some(BookingStatus::Pending) {
            warn!(%booking_id, status = %booking.status, "payments: booking is not payable");
            return Err(PaymentError::InvalidState(format!(
                "booking is {}; only pending bookings can be paid",
                booking.status
            )));
        }

        let tran_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let payment = InsertPaymentEntity {
            id: Uuid::new_v4(),
            booking_id,
            tran_id: tran_id.clone(),
            amount,
            status: PaymentStatus::Initiated.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.payment_repo
            .insert(payment)
            .await
            .map_err(store_failure("failed to record payment"))?;
        info!(%booking_id, tran_id = %tran_id, %amount, "payments: payment initiated");

        let session = tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.create_session(&tran_id, amount),
        )
        .await;

        match session {
            Ok(Ok(redirect_url)) => {
                info!(%booking_id, tran_id = %tran_id, "payments: gateway session opened");
                Ok(InitPaymentDto {
                    redirect_url,
                    tran_id,
                })
            }
            Ok(Err(err)) => {
                error!(
                    %booking_id,
                    tran_id = %tran_id,
                    gateway_error = ?err,
                    "payments: gateway rejected session; payment left initiated"
                );
                Err(PaymentError::Gateway(
                    "payment gateway rejected the request".to_string(),
                ))
            }
            Err(_) => {
                error!(
                    %booking_id,
                    tran_id = %tran_id,
                    timeout_secs = self.gateway_timeout.as_secs(),
                    "payments: gateway timed out; payment left initiated"
                );
                Err(PaymentError::Gateway(
                    "payment gateway timed out".to_string(),
                ))
            }
        }
    }

    /// Settles a payment as `success` and confirms its booking. A replay is a
    /// no-op; a success for a payment that already failed or was canceled is
    /// rejected.
    pub async fn handle_success_callback(
        &self,
        callback: GatewayCallbackModel,
    ) -> UseCaseResult<CallbackOutcome> {
        let tran_id = callback.tran_id.trim().to_string();

        let payment = self.find_payment(&tran_id).await?.ok_or_else(|| {
            warn!(tran_id = %tran_id, "payments: success callback for unknown tran_id");
            PaymentError::NotFound("payment")
        })?;

        if let Some(outcome) = judge_success(&payment)? {
            return Ok(outcome);
        }

        check_amount(&payment, callback.amount.as_deref());

        let transaction_at = match callback.tran_date.as_deref() {
            Some(raw) => {
                let parsed = parse_tran_date(raw);
                if parsed.is_none() {
                    warn!(tran_id = %tran_id, tran_date = raw, "payments: unparseable tran_date");
                }
                parsed
            }
            None => None,
        };

        let settlement = SettlePaymentEntity {
            status: PaymentStatus::Success.to_string(),
            method: callback.card_type.clone(),
            bank_tran_id: callback.bank_tran_id.clone(),
            validation_id: callback.val_id.clone(),
            transaction_at,
            updated_at: Utc::now(),
        };

        let settled = self
            .payment_repo
            .settle(&tran_id, settlement)
            .await
            .map_err(store_failure("failed to settle payment"))?;

        let Some(settled) = settled else {
            // Another callback settled it between our read and write.
            let current = self
                .find_payment(&tran_id)
                .await?
                .ok_or(PaymentError::NotFound("payment"))?;
            return judge_success(&current)?.ok_or_else(|| {
                PaymentError::Internal(anyhow!(
                    "payment {tran_id} is initiated but refused to settle"
                ))
            });
        };

        info!(
            tran_id = %tran_id,
            booking_id = %settled.booking_id,
            bank_tran_id = ?settled.bank_tran_id,
            "payments: payment succeeded"
        );
        self.publisher.publish(DomainEvent::PaymentSucceeded {
            booking_id: settled.booking_id,
            tran_id: tran_id.clone(),
            amount: settled.amount,
            at: settled.updated_at,
        });

        self.confirm_booking(&settled).await?;
        Ok(CallbackOutcome::Applied)
    }

    /// Marks an initiated payment `failed`. The booking stays pending.
    pub async fn handle_fail_callback(
        &self,
        callback: GatewayCallbackModel,
    ) -> UseCaseResult<CallbackOutcome> {
        self.settle_unpaid(callback, PaymentStatus::Failed).await
    }

    /// Marks an initiated payment `canceled`. The booking stays pending.
    pub async fn handle_cancel_callback(
        &self,
        callback: GatewayCallbackModel,
    ) -> UseCaseResult<CallbackOutcome> {
        self.settle_unpaid(callback, PaymentStatus::Canceled).await
    }

    pub async fn get_all(&self) -> UseCaseResult<Vec<PaymentDto>> {
        let payments = self
            .payment_repo
            .list()
            .await
            .map_err(store_failure("failed to list payments"))?;
        let payment_count = payments.len();
        info!(payment_count, "payments: listed");

        payments
            .into_iter()
            .map(|payment| {
                PaymentDto::try_from(payment).map_err(|err| {
                    error!(error = ?err, "payments: stored row could not be decoded");
                    PaymentError::Internal(err)
                })
            })
            .collect()
    }

    async fn find_payment(&self, tran_id: &str) -> UseCaseResult<Option<PaymentEntity>> {
        if tran_id.is_empty() {
            return Ok(None);
        }
        self.payment_repo
            .find_by_tran_id(tran_id)
            .await
            .map_err(store_failure("failed to load payment"))
    }

    async fn settle_unpaid(
        &self,
        callback: GatewayCallbackModel,
        target: PaymentStatus,
    ) -> UseCaseResult<CallbackOutcome> {
        let tran_id = callback.tran_id.trim().to_string();

        let Some(payment) = self.find_payment(&tran_id).await? else {
            warn!(
                tran_id = %tran_id,
                outcome = %target,
                "payments: callback for unknown tran_id; acknowledged"
            );
            return Ok(CallbackOutcome::Ignored);
        };

        if let Some(outcome) = judge_unpaid(&payment, target)? {
            return Ok(outcome);
        }

        let settlement = SettlePaymentEntity {
            status: target.to_string(),
            method: None,
            bank_tran_id: None,
            validation_id: None,
            transaction_at: None,
            updated_at: Utc::now(),
        };

        let settled = self
            .payment_repo
            .settle(&tran_id, settlement)
            .await
            .map_err(store_failure("failed to settle payment"))?;

        let Some(settled) = settled else {
            let current = self
                .find_payment(&tran_id)
                .await?
                .ok_or(PaymentError::NotFound("payment"))?;
            return judge_unpaid(&current, target)?.ok_or_else(|| {
                PaymentError::Internal(anyhow!(
                    "payment {tran_id} is initiated but refused to settle"
                ))
            });
        };

        info!(
            tran_id = %tran_id,
            booking_id = %settled.booking_id,
            status = %target,
            "payments: payment closed without settlement"
        );

        let event = if target == PaymentStatus::Canceled {
            DomainEvent::PaymentCanceled {
                booking_id: settled.booking_id,
                tran_id,
                at: settled.updated_at,
            }
        } else {
            DomainEvent::PaymentFailed {
                booking_id: settled.booking_id,
                tran_id,
                at: settled.updated_at,
            }
        };
        self.publisher.publish(event);

        Ok(CallbackOutcome::Applied)
    }

    async fn confirm_booking(&self, payment: &PaymentEntity) -> UseCaseResult<()> {
        let booking_id = payment.booking_id;
        let confirmed = self
            .booking_repo
            .transition_status(booking_id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await
            .map_err(store_failure("failed to confirm booking"))?;

        if let Some(booking) = confirmed {
            info!(%booking_id, tran_id = %payment.tran_id, "payments: booking confirmed");
            self.publisher.publish(DomainEvent::BookingStatusChanged {
                booking_id,
                from: BookingStatus::Pending,
                to: BookingStatus::Confirmed,
                at: booking.updated_at,
            });
            return Ok(());
        }

        let current = self
            .booking_repo
            .find_by_id(booking_id)
            .await
            .map_err(store_failure("failed to load booking"))?;
        match current.and_then(|booking| booking.booking_status()) {
            Some(BookingStatus::Confirmed) => {
                info!(%booking_id, "payments: booking was already confirmed");
            }
            status => {
                warn!(
                    %booking_id,
                    tran_id = %payment.tran_id,
                    booking_status = ?status,
                    "payments: paid booking could not be confirmed"
                );
            }
        }
        Ok(())
    }
}

/// `None` when the payment is still initiated and the success should apply.
fn judge_success(payment: &PaymentEntity) -> UseCaseResult<Option<CallbackOutcome>> {
    match payment.payment_status() {
        Some(PaymentStatus::Initiated) => Ok(None),
        Some(PaymentStatus::Success) => {
            info!(tran_id = %payment.tran_id, "payments: replayed success callback");
            Ok(Some(CallbackOutcome::AlreadyApplied))
        }
        Some(status) => {
            warn!(
                tran_id = %payment.tran_id,
                booking_id = %payment.booking_id,
                status = %status,
                "payments: success callback after payment closed; rejected"
            );
            Err(PaymentError::Conflict(format!("payment is already {status}")))
        }
        None => Err(unknown_status(payment)),
    }
}

/// `None` when the payment is still initiated and `target` should apply.
fn judge_unpaid(
    payment: &PaymentEntity,
    target: PaymentStatus,
) -> UseCaseResult<Option<CallbackOutcome>> {
    match payment.payment_status() {
        Some(PaymentStatus::Initiated) => Ok(None),
        Some(status) if status == target => {
            info!(tran_id = %payment.tran_id, status = %status, "payments: replayed callback");
            Ok(Some(CallbackOutcome::AlreadyApplied))
        }
        Some(status) => {
            warn!(
                tran_id = %payment.tran_id,
                status = %status,
                callback = %target,
                "payments: callback conflicts with settled payment; ignored"
            );
            Ok(Some(CallbackOutcome::Ignored))
        }
        None => Err(unknown_status(payment)),
    }
}

fn unknown_status(payment: &PaymentEntity) -> PaymentError {
    error!(
        tran_id = %payment.tran_id,
        status = %payment.status,
        "payments: stored payment has unknown status"
    );
    PaymentError::Internal(anyhow!(
        "payment {} has unknown status {}",
        payment.tran_id,
        payment.status
    ))
}

fn check_amount(payment: &PaymentEntity, reported: Option<&str>) {
    let Some(raw) = reported.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return;
    };
    match raw.parse::<Decimal>() {
        Ok(amount) if amount == payment.amount => {}
        Ok(amount) => warn!(
            tran_id = %payment.tran_id,
            expected = %payment.amount,
            reported = %amount,
            "payments: callback amount differs from initiated amount"
        ),
        Err(_) => warn!(
            tran_id = %payment.tran_id,
            reported = raw,
            "payments: unparseable callback amount"
        ),
    }
}
