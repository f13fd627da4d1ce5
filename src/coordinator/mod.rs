//! Response coordinator: bridges the synchronous request/response shape of
//! the HTTP API with the asynchronous pipeline workers. A handler registers
//! a pending request, hands its `request_id` into a pipeline message, and
//! awaits the oneshot the coordinator created; whichever pipeline stage
//! finally resolves the request completes that oneshot by id.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::response::AppError;
use crate::models::order::OrderResponse;

struct PendingRequest {
    sender: oneshot::Sender<Result<OrderResponse, AppError>>,
    registered_at: std::time::Instant,
    /// Last pipeline stage known to have picked this request up, reported
    /// back to the caller as `details.stage` on a `PROCESSING_TIMEOUT`.
    stage: Mutex<&'static str>,
}

pub struct ResponseCoordinator {
    pending: DashMap<Uuid, PendingRequest>,
    default_timeout: Duration,
    max_pending: usize,
}

impl ResponseCoordinator {
    pub fn new(default_timeout: Duration, max_pending: usize, cleanup_interval: Duration) -> Arc<Self> {
        let coordinator = Arc::new(Self {
            pending: DashMap::new(),
            default_timeout,
            max_pending,
        });
        let background = coordinator.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            loop {
                interval.tick().await;
                background.sweep_expired();
            }
        });
        coordinator
    }

    fn sweep_expired(&self) {
        let timeout = self.default_timeout;
        let expired: Vec<(Uuid, &'static str)> = self
            .pending
            .iter()
            .filter(|entry| entry.value().registered_at.elapsed() > timeout)
            .map(|entry| (*entry.key(), *entry.value().stage.lock()))
            .collect();
        for (request_id, stage) in expired {
            if let Some((_, pending)) = self.pending.remove(&request_id) {
                let _ = pending.sender.send(Err(AppError::timeout(stage)));
            }
        }
    }

    /// Register a new in-flight request. Returns `None` if the coordinator
    /// is already at capacity, the backpressure signal callers translate
    /// into a 503.
    pub fn register(&self) -> Option<(Uuid, oneshot::Receiver<Result<OrderResponse, AppError>>)> {
        if self.pending.len() >= self.max_pending {
            return None;
        }
        let request_id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(
            request_id,
            PendingRequest {
                sender,
                registered_at: std::time::Instant::now(),
                stage: Mutex::new("queued"),
            },
        );
        Some((request_id, receiver))
    }

    /// Record that `request_id` has reached `stage`. Called by each
    /// pipeline worker as it picks the request up, so a timeout can report
    /// the last stage actually observed rather than which wait call expired.
    pub fn advance(&self, request_id: Uuid, stage: &'static str) {
        if let Some(pending) = self.pending.get(&request_id) {
            *pending.stage.lock() = stage;
        }
    }

    pub fn complete_ok(&self, request_id: Uuid, response: OrderResponse) {
        if let Some((_, pending)) = self.pending.remove(&request_id) {
            let _ = pending.sender.send(Ok(response));
        }
    }

    pub fn complete_err(&self, request_id: Uuid, error: AppError) {
        if let Some((_, pending)) = self.pending.remove(&request_id) {
            let _ = pending.sender.send(Err(error));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Wait for a registered request to resolve, racing the coordinator's
    /// default timeout in case no worker ever completes it.
    pub async fn wait(
        &self,
        request_id: Uuid,
        receiver: oneshot::Receiver<Result<OrderResponse, AppError>>,
    ) -> Result<OrderResponse, AppError> {
        match tokio::time::timeout(self.default_timeout, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AppError::internal("COORDINATOR_DROPPED", "pipeline dropped the request without a response")),
            Err(_) => {
                let stage = self.pending.get(&request_id).map(|p| *p.stage.lock()).unwrap_or("queued");
                self.pending.remove(&request_id);
                Err(AppError::timeout(stage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_ok_resolves_the_waiter() {
        let coordinator = ResponseCoordinator::new(Duration::from_secs(5), 10, Duration::from_secs(30));
        let (request_id, receiver) = coordinator.register().unwrap();
        let response = OrderResponse {
            order_id: Uuid::new_v4(),
            client_order_id: None,
            instrument_id: "X".into(),
            side: crate::models::order::OrderSide::Buy,
            order_type: crate::models::order::OrderType::Limit,
            price: None,
            quantity: 1,
            filled_quantity: 0,
            remaining_quantity: 1,
            status: crate::models::order::OrderStatus::New,
            average_price: None,
            fees: Vec::new(),
            submission_timestamp: chrono::Utc::now(),
        };
        coordinator.complete_ok(request_id, response);
        assert!(coordinator.wait(request_id, receiver).await.is_ok());
    }

    #[tokio::test]
    async fn registration_is_refused_once_full() {
        let coordinator = ResponseCoordinator::new(Duration::from_secs(5), 1, Duration::from_secs(30));
        let first = coordinator.register();
        assert!(first.is_some());
        let second = coordinator.register();
        assert!(second.is_none());
    }
}
