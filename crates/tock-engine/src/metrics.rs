//! Per-tick timing and event-manager counters.
//!
//! [`TickMetrics`] captures one tick; [`TickStats`] folds them into a
//! rolling average that is logged every time its window fills.
//! [`EventStats`] are the event manager's cumulative counters. The logic
//! thread publishes both into a shared [`Telemetry`] cell so other threads
//! can read them without touching the engine.

use std::sync::{Mutex, PoisonError};

use tock_core::TickId;

/// Timing collected during a single tick.
///
/// All durations are in microseconds. Phases that did not run (because an
/// earlier phase failed) report zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// The tick these numbers describe.
    pub tick: TickId,
    /// Liveness sweep and task construction.
    pub build_us: u64,
    /// Sequential per-entity tick phase.
    pub tick_phase_us: u64,
    /// Parallel update-block phase.
    pub update_phase_us: u64,
    /// Parallel reset phase.
    pub reset_phase_us: u64,
    /// Wall-clock time for the whole tick.
    pub total_us: u64,
    /// Players live after the sweep.
    pub players: usize,
    /// NPCs live at build time.
    pub npcs: usize,
    /// Whether the tick took longer than its period.
    pub overran: bool,
}

// ── TickStats ──────────────────────────────────────────────────────

/// Rolling tick-time sampler.
#[derive(Clone, Debug)]
pub struct TickStats {
    window: Vec<u64>,
    samples: usize,
    recorded: u64,
    last_average_us: Option<u64>,
}

impl TickStats {
    /// Sampler that averages every `samples` ticks (minimum 1).
    pub fn new(samples: usize) -> Self {
        let samples = samples.max(1);
        Self {
            window: Vec::with_capacity(samples),
            samples,
            recorded: 0,
            last_average_us: None,
        }
    }

    /// Add one tick. Returns the window average when this sample completes
    /// a window.
    pub fn record(&mut self, metrics: &TickMetrics) -> Option<u64> {
        self.recorded += 1;
        self.window.push(metrics.total_us);
        if self.window.len() < self.samples {
            return None;
        }
        let sum: u64 = self.window.iter().sum();
        let average = sum / self.window.len() as u64;
        self.window.clear();
        self.last_average_us = Some(average);
        tracing::info!(
            average_us = average,
            samples = self.samples,
            players = metrics.players,
            npcs = metrics.npcs,
            "average tick time"
        );
        Some(average)
    }

    /// Ticks recorded so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Average of the most recently completed window.
    pub fn last_average_us(&self) -> Option<u64> {
        self.last_average_us
    }
}

// ── EventStats ─────────────────────────────────────────────────────

/// Cumulative counters kept by the event manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventStats {
    /// Event bodies run.
    pub executed: u64,
    /// Bodies that returned an error.
    pub failed: u64,
    /// Bodies that panicked.
    pub panicked: u64,
    /// Executions that took at least as long as the event's delay.
    pub overruns: u64,
    /// Worst observed gap between an event's due time and its start.
    pub worst_lateness_ms: u64,
    /// Events waiting in the schedule.
    pub pending: usize,
}

// ── Telemetry ──────────────────────────────────────────────────────

/// Metrics shared between the logic thread and observers.
#[derive(Debug, Default)]
pub struct Telemetry {
    events: Mutex<EventStats>,
    last_tick: Mutex<Option<TickMetrics>>,
}

impl Telemetry {
    /// Empty telemetry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest event-manager counters.
    pub fn event_stats(&self) -> EventStats {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Metrics of the most recent tick, if any has run.
    pub fn last_tick(&self) -> Option<TickMetrics> {
        self.last_tick
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn publish_events(&self, stats: EventStats) {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = stats;
    }

    pub(crate) fn publish_tick(&self, metrics: TickMetrics) {
        *self.last_tick.lock().unwrap_or_else(PoisonError::into_inner) = Some(metrics);
    }
}
