//! Fires the dispatch-table action exactly once per (from, to) phase
//! crossing. Owns no book or matching state itself — it calls back into
//! whatever implements `PhaseAware`.

use parking_lot::Mutex;

use crate::models::phase::Phase;

/// Whatever the transition handler drives on an edge. The venue implements
/// this; tests can supply a stub to assert actions fire exactly once.
pub trait PhaseAware {
    fn execute_opening_auction(&self);
    fn cancel_all_orders(&self);
}

pub struct PhaseTransitionHandler {
    last_observed: Mutex<Option<Phase>>,
}

impl PhaseTransitionHandler {
    pub fn new() -> Self {
        Self {
            last_observed: Mutex::new(None),
        }
    }

    /// Call on every scheduler tick with the freshly resolved phase. No-op
    /// unless the phase differs from what was last observed; the very
    /// first call only records the phase, firing nothing.
    pub fn on_phase(&self, phase: Phase, target: &dyn PhaseAware) {
        let mut last = self.last_observed.lock();
        let previous = *last;
        *last = Some(phase);
        drop(last);

        let Some(previous) = previous else {
            return;
        };
        if previous == phase {
            return;
        }

        match (previous, phase) {
            (Phase::PreOpen, Phase::OpeningAuction) => target.execute_opening_auction(),
            (Phase::Continuous, Phase::Closed) => target.cancel_all_orders(),
            _ => {}
        }
    }
}

impl Default for PhaseTransitionHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        auctions: AtomicUsize,
        cancels: AtomicUsize,
    }

    impl PhaseAware for Counter {
        fn execute_opening_auction(&self) {
            self.auctions.fetch_add(1, Ordering::SeqCst);
        }
        fn cancel_all_orders(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn first_call_records_without_firing() {
        let handler = PhaseTransitionHandler::new();
        let counter = Counter::default();
        handler.on_phase(Phase::PreOpen, &counter);
        assert_eq!(counter.auctions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fires_exactly_once_per_crossing() {
        let handler = PhaseTransitionHandler::new();
        let counter = Counter::default();
        handler.on_phase(Phase::PreOpen, &counter);
        handler.on_phase(Phase::PreOpen, &counter);
        handler.on_phase(Phase::OpeningAuction, &counter);
        handler.on_phase(Phase::OpeningAuction, &counter);
        handler.on_phase(Phase::OpeningAuction, &counter);
        assert_eq!(counter.auctions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_cancels_all() {
        let handler = PhaseTransitionHandler::new();
        let counter = Counter::default();
        handler.on_phase(Phase::Continuous, &counter);
        handler.on_phase(Phase::Closed, &counter);
        assert_eq!(counter.cancels.load(Ordering::SeqCst), 1);
    }
}
