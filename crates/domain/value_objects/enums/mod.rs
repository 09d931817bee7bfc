pub mod booking_statuses;
pub mod booking_types;
pub mod payment_statuses;
