//! Process-wide run counters.
//!
//! The engine bumps a [`Counter`] at each notable event; nothing is emitted
//! until [`Metrics::flush`], which the CLI calls once before exiting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

pub static METRICS: Metrics = Metrics::new();

/// What is being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    ValidationsRun,
    ValidationsBlocked,
    /// Warnings included.
    HardStopsRaised,
    /// Assessment, permission or knowledge lookups that fell back to defaults.
    DegradedLookups,
    StageGatesEvaluated,
}

impl Counter {
    const COUNT: usize = 5;

    fn slot(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Counter::ValidationsRun => "validations_run",
            Counter::ValidationsBlocked => "validations_blocked",
            Counter::HardStopsRaised => "hard_stops_raised",
            Counter::DegradedLookups => "degraded_lookups",
            Counter::StageGatesEvaluated => "stage_gates_evaluated",
        }
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub validations_run: u64,
    pub validations_blocked: u64,
    pub hard_stops_raised: u64,
    pub degraded_lookups: u64,
    pub stage_gates_evaluated: u64,
}

pub struct Metrics {
    counts: [AtomicU64; Counter::COUNT],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            counts: [const { AtomicU64::new(0) }; Counter::COUNT],
        }
    }

    pub fn incr(&self, counter: Counter) {
        self.add(counter, 1);
    }

    pub fn add(&self, counter: Counter, n: u64) {
        if n == 0 {
            return;
        }
        self.counts[counter.slot()].fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = counter.name(), n, "counter bumped");
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counts[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            validations_run: self.get(Counter::ValidationsRun),
            validations_blocked: self.get(Counter::ValidationsBlocked),
            hard_stops_raised: self.get(Counter::HardStopsRaised),
            degraded_lookups: self.get(Counter::DegradedLookups),
            stage_gates_evaluated: self.get(Counter::StageGatesEvaluated),
        }
    }

    /// Log the current totals as one `info` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            validations_run = s.validations_run,
            validations_blocked = s.validations_blocked,
            hard_stops_raised = s.hard_stops_raised,
            degraded_lookups = s.degraded_lookups,
            stage_gates_evaluated = s.stage_gates_evaluated,
            "run totals"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let m = Metrics::new();
        m.incr(Counter::ValidationsRun);
        m.incr(Counter::ValidationsRun);
        m.add(Counter::HardStopsRaised, 3);
        m.incr(Counter::StageGatesEvaluated);

        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                validations_run: 2,
                hard_stops_raised: 3,
                stage_gates_evaluated: 1,
                ..MetricsSnapshot::default()
            }
        );
    }

    #[test]
    fn adding_zero_is_a_no_op() {
        let m = Metrics::new();
        m.add(Counter::HardStopsRaised, 0);
        assert_eq!(m.get(Counter::HardStopsRaised), 0);
    }

    #[test]
    fn snapshot_serializes_with_counter_names() {
        let m = Metrics::new();
        m.incr(Counter::DegradedLookups);
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["degraded_lookups"], 1);
        assert_eq!(json["validations_blocked"], 0);
    }
}
