//! Drift-compensated rescheduling of recurring events.
//!
//! The manager is an explicit min-heap keyed by `(fire_at, seq)`. The
//! logic thread asks it for the next deadline, sleeps until then, and
//! calls [`EventManager::run_due`]. Each pass first pops every event that
//! is due, then runs them in fire order, then pushes the survivors back.
//! An event rescheduled with zero delay therefore waits for the next pass
//! instead of running again immediately, so an overrunning event never
//! produces a catch-up burst.
//!
//! After each execution the next delay is the event's (possibly changed)
//! delay minus the time the execution took, clamped to zero.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tock_core::{Clock, Millis};
use tock_task::panic_message;

use crate::event::{EventContext, RecurringEvent};
use crate::logic_thread::Services;
use crate::metrics::EventStats;

struct Scheduled {
    fire_at: Millis,
    seq: u64,
    event: RecurringEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.fire_at, self.seq).cmp(&(other.fire_at, other.seq))
    }
}

/// Owner of every scheduled [`RecurringEvent`].
pub struct EventManager {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    clock: Arc<dyn Clock>,
    stats: EventStats,
}

impl EventManager {
    /// An empty schedule reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            clock,
            stats: EventStats::default(),
        }
    }

    /// Schedule `event` to fire `event.delay` ms from now. Stopped events
    /// are dropped.
    pub fn submit(&mut self, event: RecurringEvent) {
        if !event.handle().is_running() {
            return;
        }
        let fire_at = self.clock.now().after(event.handle().delay());
        self.push(fire_at, event);
    }

    fn push(&mut self, fire_at: Millis, event: RecurringEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled {
            fire_at,
            seq,
            event,
        }));
    }

    /// When the earliest scheduled event is due.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.heap.peek().map(|Reverse(s)| s.fire_at)
    }

    /// Number of scheduled events, including stopped ones not yet reaped.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Cumulative counters.
    pub fn stats(&self) -> EventStats {
        EventStats {
            pending: self.heap.len(),
            ..self.stats
        }
    }

    /// Run every event that is due now. Returns how many bodies ran.
    ///
    /// Failures and panics are logged and counted; they never stop the
    /// failing event from being rescheduled.
    pub fn run_due(&mut self, services: &Services) -> usize {
        let now = self.clock.now();
        let mut due = Vec::new();
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.fire_at > now {
                break;
            }
            if let Some(Reverse(s)) = self.heap.pop() {
                due.push(s);
            }
        }

        let mut executed = 0;
        for Scheduled { fire_at, event, .. } in due {
            if let Some((next_at, event)) = self.run_one(fire_at, event, services) {
                self.push(next_at, event);
            }
            executed += 1;
        }
        executed
    }

    fn run_one(
        &mut self,
        fire_at: Millis,
        mut event: RecurringEvent,
        services: &Services,
    ) -> Option<(Millis, RecurringEvent)> {
        if !event.handle().is_running() {
            return None;
        }

        let started = self.clock.now();
        let lateness = started.since(fire_at);
        self.stats.worst_lateness_ms = self.stats.worst_lateness_ms.max(lateness);

        let handle = event.handle().clone();
        let result = {
            let ctx = EventContext::new(&handle, started, services);
            panic::catch_unwind(AssertUnwindSafe(|| event.execute(&ctx)))
        };
        self.stats.executed += 1;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.stats.failed += 1;
                tracing::warn!(event = event.name(), error = %e, "event failed");
            }
            Err(payload) => {
                self.stats.panicked += 1;
                tracing::error!(
                    event = event.name(),
                    panic = %panic_message(payload.as_ref()),
                    "event panicked"
                );
            }
        }

        if !handle.is_running() {
            return None;
        }

        let finished = self.clock.now();
        let elapsed = finished.since(started);
        let delay = handle.delay();
        if elapsed >= delay && delay > 0 {
            self.stats.overruns += 1;
            tracing::warn!(
                event = event.name(),
                elapsed_ms = elapsed,
                delay_ms = delay,
                "event overran its delay"
            );
        }
        Some((finished.after(delay.saturating_sub(elapsed)), event))
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("pending", &self.heap.len())
            .field("next_deadline", &self.next_deadline())
            .field("stats", &self.stats)
            .finish()
    }
}
