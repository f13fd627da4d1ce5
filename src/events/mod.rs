//! Event fan-out for the push channel (§4.10). Every event is stamped with a
//! bus-wide sequence number at publish time, used only to order delivery
//! within the broadcast channel; each websocket connection renumbers events
//! into its own per-connection sequence before they go out over the wire, so
//! a client can detect skips in what it actually receives rather than in
//! publish order across every other connection. Slow consumers are handled
//! by `tokio::broadcast`'s own policy — drop the oldest buffered events and
//! let the receiver's next `recv()` report how many were skipped, rather
//! than blocking the publisher.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::order::OrderResponse;
use crate::models::phase::Phase;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    NewOrderAck { team_id: Uuid, order: OrderResponse },
    ExecutionReport { team_id: Uuid, order: OrderResponse },
    OrderCancelled { team_id: Uuid, order_id: Uuid, instrument_id: String },
    PositionSnapshot { team_id: Uuid, positions: std::collections::HashMap<String, i64> },
    PhaseChange { phase: Phase },
}

impl EventPayload {
    /// The team this event is private to, if any. `PhaseChange` has none —
    /// it is broadcast to every connection regardless of owner.
    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            EventPayload::NewOrderAck { team_id, .. } => Some(*team_id),
            EventPayload::ExecutionReport { team_id, .. } => Some(*team_id),
            EventPayload::OrderCancelled { team_id, .. } => Some(*team_id),
            EventPayload::PositionSnapshot { team_id, .. } => Some(*team_id),
            EventPayload::PhaseChange { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
    next_seq: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish one event. Returns the number of live subscribers at publish
    /// time; zero is not an error, it just means nobody was listening.
    pub fn publish(&self, payload: EventPayload) -> usize {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            seq,
            timestamp: Utc::now(),
            payload,
        };
        self.sender.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_numbers_increase_monotonically() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(EventPayload::PhaseChange { phase: Phase::PreOpen });
        bus.publish(EventPayload::PhaseChange { phase: Phase::OpeningAuction });
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
    }

    #[tokio::test]
    async fn lagging_receiver_reports_skip_and_keeps_going() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(EventPayload::PhaseChange {
                phase: if i % 2 == 0 { Phase::PreOpen } else { Phase::Continuous },
            });
        }
        let result = rx.recv().await;
        assert!(matches!(result, Err(broadcast::error::RecvError::Lagged(_))));
        assert!(rx.recv().await.is_ok());
    }
}
