//! In-memory repositories.
//!
//! Each store keeps its rows behind a `tokio::sync::RwLock` and checks the same
//! constraints the Postgres schema enforces while holding the write lock, so a
//! check and its insert are atomic with respect to other callers.

pub mod bookings;
pub mod catalog;
pub mod payments;

pub use bookings::InMemoryBookingStore;
pub use catalog::InMemoryCatalog;
pub use payments::InMemoryPaymentStore;
