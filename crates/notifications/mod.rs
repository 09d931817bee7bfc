//! Outbound domain events.
//!
//! Use cases publish onto a bounded queue and never wait on delivery. A single
//! worker drains the queue and hands every event to each sink, retrying a
//! failing sink a bounded number of times before giving up on that event.

pub mod dispatcher;
pub mod events;
pub mod sinks;

pub use dispatcher::{DispatchPolicy, DispatchWorker, NotificationDispatcher, NotificationSink};
pub use events::{DomainEvent, EventPublisher};
