use chrono::{DateTime, Utc};
use mockall::automock;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    booking_statuses::BookingStatus, booking_types::BookingType,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingCreated {
        booking_id: Uuid,
        booking_type: BookingType,
        patient_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        serial_number: Option<i32>,
        at: DateTime<Utc>,
    },
    BookingStatusChanged {
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        at: DateTime<Utc>,
    },
    PaymentSucceeded {
        booking_id: Uuid,
        tran_id: String,
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
        at: DateTime<Utc>,
    },
    PaymentFailed {
        booking_id: Uuid,
        tran_id: String,
        at: DateTime<Utc>,
    },
    PaymentCanceled {
        booking_id: Uuid,
        tran_id: String,
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BookingCreated { .. } => "booking_created",
            DomainEvent::BookingStatusChanged { .. } => "booking_status_changed",
            DomainEvent::PaymentSucceeded { .. } => "payment_succeeded",
            DomainEvent::PaymentFailed { .. } => "payment_failed",
            DomainEvent::PaymentCanceled { .. } => "payment_canceled",
        }
    }

    pub fn booking_id(&self) -> Uuid {
        match self {
            DomainEvent::BookingCreated { booking_id, .. }
            | DomainEvent::BookingStatusChanged { booking_id, .. }
            | DomainEvent::PaymentSucceeded { booking_id, .. }
            | DomainEvent::PaymentFailed { booking_id, .. }
            | DomainEvent::PaymentCanceled { booking_id, .. } => *booking_id,
        }
    }
}

/// Fire-and-forget publication. Implementations must not block the caller.
#[automock]
pub trait EventPublisher {
    fn publish(&self, event: DomainEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let booking_id = Uuid::new_v4();
        let event = DomainEvent::BookingStatusChanged {
            booking_id,
            from: BookingStatus::Pending,
            to: BookingStatus::Confirmed,
            at: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "booking_status_changed");
        assert_eq!(json["from"], "pending");
        assert_eq!(json["to"], "confirmed");
        assert_eq!(json["booking_id"], booking_id.to_string());
        assert_eq!(event.name(), "booking_status_changed");
    }
}
