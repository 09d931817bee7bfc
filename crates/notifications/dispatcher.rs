use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};

use super::events::{DomainEvent, EventPublisher};

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &DomainEvent) -> Result<()>;
    fn sink_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
    pub capacity: usize,
    pub max_attempts: u32,
    /// Wait before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<DomainEvent>,
    pending: Arc<AtomicUsize>,
}

/// Handle on the delivery task. Events accepted by the queue are only
/// guaranteed a delivery attempt if the process waits on `shutdown`.
pub struct DispatchWorker {
    handle: JoinHandle<()>,
    pending: Arc<AtomicUsize>,
}

impl DispatchWorker {
    /// Waits up to `grace` for the queue to drain once every dispatcher clone
    /// is gone. Returns how many accepted events never finished delivery.
    pub async fn shutdown(self, grace: Duration) -> usize {
        let queued = self.pending.load(Ordering::SeqCst);
        if queued > 0 {
            info!(queued, "notifications: draining queue before exit");
        }

        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(error = %err, "notifications: delivery worker crashed");
            }
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "notifications: queue did not drain in time"
                );
            }
        }

        let undelivered = self.pending.load(Ordering::SeqCst);
        if undelivered > 0 {
            error!(undelivered, "notifications: events left undelivered at shutdown");
        }
        undelivered
    }
}

impl NotificationDispatcher {
    /// Starts the delivery worker. The worker exits once every dispatcher
    /// clone has been dropped and the queue is drained.
    pub fn spawn(
        sinks: Vec<Arc<dyn NotificationSink>>,
        policy: DispatchPolicy,
    ) -> (Self, DispatchWorker) {
        let (tx, mut rx) = mpsc::channel::<DomainEvent>(policy.capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));

        let in_flight = Arc::clone(&pending);
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                for sink in &sinks {
                    deliver_with_retry(sink.as_ref(), &event, policy).await;
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        });

        let worker = DispatchWorker {
            handle,
            pending: Arc::clone(&pending),
        };
        (Self { tx, pending }, worker)
    }

    /// Returns false when the event was dropped.
    pub fn try_publish(&self, event: DomainEvent) -> bool {
        // Counted before the send so the worker can never decrement first.
        self.pending.fetch_add(1, Ordering::SeqCst);
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                warn!(
                    event = event.name(),
                    booking_id = %event.booking_id(),
                    "notifications: queue full; dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                warn!(
                    event = event.name(),
                    booking_id = %event.booking_id(),
                    "notifications: queue closed; dropping event"
                );
                false
            }
        }
    }
}

impl EventPublisher for NotificationDispatcher {
    fn publish(&self, event: DomainEvent) {
        self.try_publish(event);
    }
}

async fn deliver_with_retry(sink: &dyn NotificationSink, event: &DomainEvent, policy: DispatchPolicy) {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match sink.deliver(event).await {
            Ok(()) => return,
            Err(err) if attempt < max_attempts => {
                warn!(
                    sink = sink.sink_name(),
                    event = event.name(),
                    attempt,
                    error = %err,
                    "notifications: delivery failed; retrying"
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(err) => {
                error!(
                    sink = sink.sink_name(),
                    event = event.name(),
                    booking_id = %event.booking_id(),
                    attempts = max_attempts,
                    error = %err,
                    "notifications: giving up on event"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::{Mutex, Notify};
    use uuid::Uuid;

    fn failed_event() -> DomainEvent {
        DomainEvent::PaymentFailed {
            booking_id: Uuid::new_v4(),
            tran_id: Uuid::new_v4().to_string(),
            at: Utc::now(),
        }
    }

    fn quick_policy(capacity: usize, max_attempts: u32) -> DispatchPolicy {
        DispatchPolicy {
            capacity,
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    /// Fails the first `failures` calls, then records what it delivered.
    struct FlakySink {
        failures: u32,
        calls: AtomicU32,
        delivered: Mutex<Vec<DomainEvent>>,
    }

    impl FlakySink {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn deliver(&self, event: &DomainEvent) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                anyhow::bail!("sink unavailable");
            }
            self.delivered.lock().await.push(event.clone());
            Ok(())
        }

        fn sink_name(&self) -> &'static str {
            "flaky"
        }
    }

    /// Blocks on `gate` after signalling `entered`.
    struct GatedSink {
        entered: Notify,
        gate: Notify,
        delivered: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl NotificationSink for GatedSink {
        async fn deliver(&self, event: &DomainEvent) -> Result<()> {
            self.entered.notify_one();
            self.gate.notified().await;
            self.delivered.lock().await.push(event.clone());
            Ok(())
        }

        fn sink_name(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn retries_until_sink_recovers() {
        let sink = FlakySink::new(2);
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink.clone()];
        let (dispatcher, worker) = NotificationDispatcher::spawn(sinks, quick_policy(8, 3));

        let event = failed_event();
        assert!(dispatcher.try_publish(event.clone()));
        drop(dispatcher);
        assert_eq!(worker.shutdown(Duration::from_secs(5)).await, 0);

        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
        assert_eq!(*sink.delivered.lock().await, vec![event]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_and_keeps_draining() {
        let sink = FlakySink::new(2);
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink.clone()];
        let (dispatcher, worker) = NotificationDispatcher::spawn(sinks, quick_policy(8, 2));

        let lost = failed_event();
        let kept = failed_event();
        dispatcher.publish(lost);
        dispatcher.publish(kept.clone());
        drop(dispatcher);
        assert_eq!(worker.shutdown(Duration::from_secs(5)).await, 0);

        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
        assert_eq!(*sink.delivered.lock().await, vec![kept]);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let sink = Arc::new(GatedSink {
            entered: Notify::new(),
            gate: Notify::new(),
            delivered: Mutex::new(Vec::new()),
        });
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink.clone()];
        let (dispatcher, worker) = NotificationDispatcher::spawn(sinks, quick_policy(1, 1));

        let first = failed_event();
        let second = failed_event();
        assert!(dispatcher.try_publish(first.clone()));
        sink.entered.notified().await;

        assert!(dispatcher.try_publish(second.clone()));
        assert!(!dispatcher.try_publish(failed_event()));

        sink.gate.notify_one();
        sink.entered.notified().await;
        sink.gate.notify_one();
        drop(dispatcher);
        assert_eq!(worker.shutdown(Duration::from_secs(5)).await, 0);

        assert_eq!(*sink.delivered.lock().await, vec![first, second]);
    }

    /// Takes `delay` per delivery.
    struct SlowSink {
        delay: Duration,
        delivered: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl NotificationSink for SlowSink {
        async fn deliver(&self, event: &DomainEvent) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.delivered.lock().await.push(event.clone());
            Ok(())
        }

        fn sink_name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn shutdown_drains_queued_events() {
        let sink = Arc::new(SlowSink {
            delay: Duration::from_millis(20),
            delivered: Mutex::new(Vec::new()),
        });
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink.clone()];
        let (dispatcher, worker) = NotificationDispatcher::spawn(sinks, quick_policy(8, 1));

        let events: Vec<DomainEvent> = (0..5).map(|_| failed_event()).collect();
        for event in &events {
            dispatcher.publish(event.clone());
        }
        drop(dispatcher);

        assert_eq!(worker.shutdown(Duration::from_secs(5)).await, 0);
        assert_eq!(*sink.delivered.lock().await, events);
    }

    #[tokio::test]
    async fn shutdown_reports_events_stuck_past_the_grace_period() {
        let sink = Arc::new(GatedSink {
            entered: Notify::new(),
            gate: Notify::new(),
            delivered: Mutex::new(Vec::new()),
        });
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink.clone()];
        let (dispatcher, worker) = NotificationDispatcher::spawn(sinks, quick_policy(8, 1));

        dispatcher.publish(failed_event());
        dispatcher.publish(failed_event());
        drop(dispatcher);

        assert_eq!(worker.shutdown(Duration::from_millis(50)).await, 2);
        assert!(sink.delivered.lock().await.is_empty());
    }

    #[tokio::test]
    async fn dropped_events_are_not_counted_as_pending() {
        let sink = Arc::new(GatedSink {
            entered: Notify::new(),
            gate: Notify::new(),
            delivered: Mutex::new(Vec::new()),
        });
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![sink.clone()];
        let (dispatcher, worker) = NotificationDispatcher::spawn(sinks, quick_policy(1, 1));

        assert!(dispatcher.try_publish(failed_event()));
        sink.entered.notified().await;
        assert!(dispatcher.try_publish(failed_event()));
        assert!(!dispatcher.try_publish(failed_event()));
        drop(dispatcher);

        assert_eq!(worker.shutdown(Duration::from_millis(50)).await, 2);
    }
}
