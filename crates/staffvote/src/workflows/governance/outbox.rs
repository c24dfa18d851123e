use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Audience for an outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Management,
    Staff,
}

/// Persisted notification record. The core commits state and enqueues one of
/// these in the same flow; delivery happens later from the relay, so a
/// notifier failure can never unwind a committed state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: u64,
    pub channel: NotificationChannel,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Error enumeration for outbox persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("outbox unavailable: {0}")]
    Unavailable(String),
}

/// Notification transport failure. Best-effort; the relay retries later.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Store-and-forward queue between the engines and the notifier.
pub trait NotificationOutbox: Send + Sync {
    fn enqueue(
        &self,
        channel: NotificationChannel,
        payload: serde_json::Value,
    ) -> Result<(), OutboxError>;

    fn pending(&self, limit: usize) -> Result<Vec<NotificationEvent>, OutboxError>;
    fn mark_delivered(&self, id: u64, at: DateTime<Utc>) -> Result<(), OutboxError>;
    fn pending_count(&self) -> Result<usize, OutboxError>;
}

/// Delivery boundary. Message formatting and transport live outside this
/// crate.
pub trait Notifier: Send + Sync {
    fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

#[derive(Default)]
struct OutboxInner {
    events: Vec<NotificationEvent>,
}

#[derive(Default, Clone)]
pub struct InMemoryOutbox {
    inner: Arc<Mutex<OutboxInner>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryOutbox {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.inner
            .lock()
            .expect("outbox mutex poisoned")
            .events
            .clone()
    }
}

impl NotificationOutbox for InMemoryOutbox {
    fn enqueue(
        &self,
        channel: NotificationChannel,
        payload: serde_json::Value,
    ) -> Result<(), OutboxError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self.inner.lock().expect("outbox mutex poisoned");
        guard.events.push(NotificationEvent {
            id,
            channel,
            payload,
            created_at: Utc::now(),
            delivered_at: None,
        });
        Ok(())
    }

    fn pending(&self, limit: usize) -> Result<Vec<NotificationEvent>, OutboxError> {
        let guard = self.inner.lock().expect("outbox mutex poisoned");
        Ok(guard
            .events
            .iter()
            .filter(|event| event.delivered_at.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_delivered(&self, id: u64, at: DateTime<Utc>) -> Result<(), OutboxError> {
        let mut guard = self.inner.lock().expect("outbox mutex poisoned");
        if let Some(event) = guard.events.iter_mut().find(|event| event.id == id) {
            if event.delivered_at.is_none() {
                event.delivered_at = Some(at);
            }
        }
        Ok(())
    }

    fn pending_count(&self) -> Result<usize, OutboxError> {
        let guard = self.inner.lock().expect("outbox mutex poisoned");
        Ok(guard
            .events
            .iter()
            .filter(|event| event.delivered_at.is_none())
            .count())
    }
}

const RELAY_BATCH: usize = 32;

/// Drains pending events through the notifier. Failed deliveries stay
/// pending and are retried on the next drain.
pub struct OutboxRelay<O, N> {
    outbox: Arc<O>,
    notifier: Arc<N>,
}

impl<O, N> OutboxRelay<O, N>
where
    O: NotificationOutbox,
    N: Notifier,
{
    pub fn new(outbox: Arc<O>, notifier: Arc<N>) -> Self {
        Self { outbox, notifier }
    }

    /// Deliver one batch. Returns the number delivered.
    pub fn drain(&self, now: DateTime<Utc>) -> Result<usize, OutboxError> {
        let pending = self.outbox.pending(RELAY_BATCH)?;
        let mut delivered = 0;
        for event in pending {
            match self.notifier.deliver(&event) {
                Ok(()) => {
                    self.outbox.mark_delivered(event.id, now)?;
                    delivered += 1;
                }
                Err(error) => {
                    warn!(event = event.id, %error, "notification delivery failed; will retry");
                }
            }
        }
        Ok(delivered)
    }
}

/// Notifier that drops messages, for deployments without a transport wired.
#[derive(Default, Clone)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn deliver(&self, _event: &NotificationEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FlakyNotifier {
        fail_ids: Vec<u64>,
    }

    impl Notifier for FlakyNotifier {
        fn deliver(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
            if self.fail_ids.contains(&event.id) {
                Err(NotifyError::Transport("down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn failed_deliveries_stay_pending_for_retry() {
        let outbox = Arc::new(InMemoryOutbox::default());
        outbox
            .enqueue(NotificationChannel::Management, json!({"n": 1}))
            .expect("enqueue");
        outbox
            .enqueue(NotificationChannel::Staff, json!({"n": 2}))
            .expect("enqueue");

        let relay = OutboxRelay::new(
            outbox.clone(),
            Arc::new(FlakyNotifier { fail_ids: vec![1] }),
        );
        let delivered = relay.drain(Utc::now()).expect("drain");
        assert_eq!(delivered, 1);
        assert_eq!(outbox.pending_count().expect("count"), 1);

        let relay = OutboxRelay::new(outbox.clone(), Arc::new(FlakyNotifier { fail_ids: vec![] }));
        let delivered = relay.drain(Utc::now()).expect("drain");
        assert_eq!(delivered, 1);
        assert_eq!(outbox.pending_count().expect("count"), 0);
    }
}
