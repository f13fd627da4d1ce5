//! Worker-per-stage concurrency pipeline (§4.8): validator -> matching ->
//! settlement, connected by bounded channels. `spawn_all` wires the three
//! stages and hands back the single entry point callers feed orders into.

pub mod matching_stage;
pub mod messages;
pub mod settlement_stage;
pub mod validator_stage;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::constraints::ConstraintRegistry;
use crate::coordinator::ResponseCoordinator;
use crate::events::EventBus;
use crate::fees::FeeService;
use crate::orders::OrderBlotter;
use crate::positions::PositionService;
use crate::rate_limit::RateLimiter;
use crate::teams::TeamRegistry;
use crate::venue::Venue;

use messages::OrderRequestMsg;

pub struct PipelineHandles {
    pub entry: mpsc::Sender<OrderRequestMsg>,
    pub validator: tokio::task::JoinHandle<()>,
    pub matching: tokio::task::JoinHandle<()>,
    pub settlement: tokio::task::JoinHandle<()>,
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_all(
    constraints: Arc<ConstraintRegistry>,
    positions: Arc<PositionService>,
    rate_limiter: Arc<RateLimiter>,
    venue: Arc<Venue>,
    coordinator: Arc<ResponseCoordinator>,
    fees: Arc<FeeService>,
    teams: Arc<TeamRegistry>,
    blotter: Arc<OrderBlotter>,
    events: Arc<EventBus>,
    channel_capacity: usize,
    phase_check_interval: Duration,
) -> PipelineHandles {
    let (entry_tx, entry_rx) = mpsc::channel(channel_capacity);
    let (match_tx, match_rx) = mpsc::channel(channel_capacity);
    let (settle_tx, settle_rx) = mpsc::channel(channel_capacity);

    let validator = validator_stage::spawn(entry_rx, match_tx, constraints, positions.clone(), rate_limiter, venue.clone(), coordinator.clone());
    let matching = matching_stage::spawn(match_rx, settle_tx, venue, coordinator.clone(), blotter.clone(), events.clone(), phase_check_interval);
    let settlement = settlement_stage::spawn(settle_rx, positions, fees, teams, blotter, events, coordinator);

    PipelineHandles {
        entry: entry_tx,
        validator,
        matching,
        settlement,
    }
}
