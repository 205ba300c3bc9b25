//! Per-entity action queue: admission, advancement, interruption.
//!
//! The queue holds at most one dispatched ("current") action and a FIFO
//! backlog. Only [`advance`](ActionQueue::advance) dispatches, and it does
//! nothing while the current action is still running, so an entity never
//! has two actions with the event manager at once.
//!
//! Every queued action gets a stop hook that asks the logic thread to
//! advance this entity's queue. The hook is attached only once the action
//! is admitted; dropped actions are stopped first and never signal.

use std::collections::VecDeque;

use tock_core::EntityId;

use crate::action::{Action, ActionHandle, AdmissionPolicy};
use crate::logic_thread::EventSubmitter;

/// Result of [`ActionQueue::enqueue`]. Drops are silent by contract; the
/// outcome exists for logs and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the backlog (and possibly dispatched straight away).
    Queued,
    /// Backlog was full; the action was stopped.
    DroppedFull,
    /// `Never` admission with work already queued; the action was stopped.
    DroppedBusy,
    /// The action was already stopped.
    DroppedStopped,
}

/// One entity's actions.
#[derive(Debug)]
pub struct ActionQueue {
    entity: EntityId,
    capacity: usize,
    current: Option<ActionHandle>,
    backlog: VecDeque<Action>,
}

impl ActionQueue {
    /// Empty queue for `entity` whose backlog holds at most `capacity`.
    pub fn new(entity: EntityId, capacity: usize) -> Self {
        Self {
            entity,
            capacity,
            current: None,
            backlog: VecDeque::with_capacity(capacity),
        }
    }

    /// Owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Backlog bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The dispatched action, if any. May be stopped but not yet cleared.
    pub fn current(&self) -> Option<&ActionHandle> {
        self.current.as_ref()
    }

    /// Actions waiting behind the current one.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Whether nothing is dispatched or waiting.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.backlog.is_empty()
    }

    /// Offer an action to the queue.
    pub fn enqueue(&mut self, action: Action, submitter: &EventSubmitter) -> EnqueueOutcome {
        if !action.is_running() {
            return EnqueueOutcome::DroppedStopped;
        }
        if self.backlog.len() >= self.capacity {
            action.stop();
            tracing::trace!(entity = %self.entity, "action backlog full, dropping action");
            return EnqueueOutcome::DroppedFull;
        }
        self.clear_finished();
        if action.admission() == AdmissionPolicy::Never && !self.is_idle() {
            action.stop();
            tracing::trace!(entity = %self.entity, "queue busy, dropping never-queued action");
            return EnqueueOutcome::DroppedBusy;
        }

        let signal = submitter.clone();
        let entity = self.entity;
        action.handle().event().set_stop_hook(Box::new(move || {
            // Best effort: after shutdown nobody is left to advance.
            let _ = signal.advance(entity);
        }));
        self.backlog.push_back(action);
        self.advance(submitter);
        EnqueueOutcome::Queued
    }

    fn clear_finished(&mut self) {
        if self.current.as_ref().is_some_and(|c| !c.is_running()) {
            self.current = None;
        }
    }

    /// Dispatch the next action if nothing is running.
    ///
    /// A stopped current action is cleared. Backlogged actions that were
    /// stopped while waiting are discarded without being dispatched.
    pub fn advance(&mut self, submitter: &EventSubmitter) {
        if self.current.as_ref().is_some_and(ActionHandle::is_running) {
            return;
        }
        self.current = None;
        while let Some(action) = self.backlog.pop_front() {
            if !action.is_running() {
                continue;
            }
            let (handle, event) = action.into_parts();
            if submitter.submit(event).is_err() {
                tracing::debug!(entity = %self.entity, "engine stopped, discarding action");
                handle.stop();
                continue;
            }
            self.current = Some(handle);
            return;
        }
    }

    /// Stop and remove every action. Returns how many were stopped by this
    /// call.
    pub fn cancel_all(&mut self) -> usize {
        let mut stopped = 0;
        for action in self.backlog.drain(..) {
            stopped += usize::from(action.stop());
        }
        if let Some(current) = self.current.take() {
            stopped += usize::from(current.stop());
        }
        stopped
    }

    /// Stop and remove every action that movement interrupts. Does nothing
    /// unless `by_movement` is set.
    ///
    /// Returns how many actions were removed.
    pub fn clear_interruptible(&mut self, by_movement: bool) -> usize {
        if !by_movement {
            return 0;
        }
        let mut removed = 0;
        let interrupted = self
            .current
            .as_ref()
            .is_some_and(|c| c.interruption().stopped_by_movement());
        if let Some(current) = self.current.take_if(|_| interrupted) {
            current.stop();
            removed += 1;
        }
        self.backlog.retain(|action| {
            if action.interruption().stopped_by_movement() {
                action.stop();
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}
