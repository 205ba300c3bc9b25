//! Test utilities and mock types for tock development.
//!
//! Provides a manually driven [`ManualClock`], a recording
//! [`MockSession`], and small [`Event`] bodies that count or log their
//! executions. World fixtures live in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tock_core::{Clock, EntityId, Millis};
use tock_engine::{
    Action, AdmissionPolicy, Event, EventContext, EventError, InterruptionPolicy, PlayerUpdate,
    Session,
};

// ── ManualClock ────────────────────────────────────────────────────

/// A [`Clock`] that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now.load(Ordering::SeqCst))
    }
}

// ── MockSession ────────────────────────────────────────────────────

/// A [`Session`] that keeps every update it is sent.
#[derive(Debug)]
pub struct MockSession {
    connected: AtomicBool,
    closes: AtomicUsize,
    updates: Mutex<Vec<PlayerUpdate>>,
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
        })
    }

    /// Simulate the client dropping the connection.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// How many times the engine closed this session.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.lock().len()
    }

    pub fn last_update(&self) -> Option<PlayerUpdate> {
        self.lock().last().cloned()
    }

    pub fn updates(&self) -> Vec<PlayerUpdate> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PlayerUpdate>> {
        self.updates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Session for MockSession {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn send_update(&self, update: &PlayerUpdate) {
        self.lock().push(update.clone());
    }
}

// ── CountingEvent ──────────────────────────────────────────────────

/// Counts its executions and stops itself after `limit`, if set.
#[derive(Debug)]
pub struct CountingEvent {
    count: Arc<AtomicUsize>,
    limit: Option<usize>,
}

impl CountingEvent {
    /// Runs forever.
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (
            Self {
                count: Arc::clone(&count),
                limit: None,
            },
            count,
        )
    }

    /// Stops itself after `limit` executions.
    pub fn with_limit(limit: usize) -> (Self, Arc<AtomicUsize>) {
        let (mut event, count) = Self::new();
        event.limit = Some(limit);
        (event, count)
    }
}

impl Event for CountingEvent {
    fn execute(&mut self, ctx: &EventContext<'_>) -> Result<(), EventError> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.limit.is_some_and(|limit| n >= limit) {
            ctx.stop();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

// ── RecordingAction ────────────────────────────────────────────────

/// Shared log of `(label, fired_at)` pairs written by [`RecordingAction`]s.
pub type ActionLog = Arc<Mutex<Vec<(String, Millis)>>>;

/// An action body that appends its label and fire time to a shared log,
/// then stops after `repeats` executions.
#[derive(Debug)]
pub struct RecordingAction {
    label: String,
    log: ActionLog,
    remaining: usize,
}

impl RecordingAction {
    /// Build a ready-to-enqueue [`Action`].
    pub fn action(
        entity: EntityId,
        label: impl Into<String>,
        delay_ms: u64,
        repeats: usize,
        admission: AdmissionPolicy,
        interruption: InterruptionPolicy,
        log: &ActionLog,
    ) -> Action {
        Action::new(
            entity,
            delay_ms,
            admission,
            interruption,
            Self {
                label: label.into(),
                log: Arc::clone(log),
                remaining: repeats,
            },
        )
    }

    /// One-shot action that may be queued behind others and is
    /// interrupted by movement.
    pub fn once(entity: EntityId, label: impl Into<String>, log: &ActionLog) -> Action {
        Self::action(
            entity,
            label,
            1,
            1,
            AdmissionPolicy::Always,
            InterruptionPolicy::InterruptibleByMovement,
            log,
        )
    }
}

/// An empty action log.
pub fn action_log() -> ActionLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Labels in the log, in firing order.
pub fn labels(log: &ActionLog) -> Vec<String> {
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|(label, _)| label.clone())
        .collect()
}

impl Event for RecordingAction {
    fn execute(&mut self, ctx: &EventContext<'_>) -> Result<(), EventError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((self.label.clone(), ctx.now()));
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            ctx.stop();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
