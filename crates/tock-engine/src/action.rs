//! Actions: recurring events owned by one entity.
//!
//! An action is a [`RecurringEvent`] bound to an [`EntityId`] and carrying
//! two policies. The [`AdmissionPolicy`] decides whether it may join a busy
//! queue; the [`InterruptionPolicy`] decides whether walking cancels it.
//! Actions live in their entity's
//! [`ActionQueue`](crate::action_queue::ActionQueue) and the queue is the
//! only thing that hands them to the event manager.

use std::fmt;

use tock_core::EntityId;

use crate::event::{Event, EventHandle, RecurringEvent};

/// Whether an action may be queued behind other work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdmissionPolicy {
    /// Always queued, capacity permitting.
    Always,
    /// Dropped if the queue already has a current or backlogged action.
    Never,
}

/// How an action reacts to its entity moving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterruptionPolicy {
    /// Cancelled by movement.
    InterruptibleByMovement,
    /// Cancelled by movement; the body is expected to re-issue itself
    /// toward its target.
    FollowOnMovement,
    /// Unaffected by movement.
    ImmuneToMovement,
}

impl InterruptionPolicy {
    /// Whether movement cancels an action with this policy.
    pub fn stopped_by_movement(self) -> bool {
        !matches!(self, Self::ImmuneToMovement)
    }
}

/// The part of an action that stays with the queue while the event
/// manager owns the body.
#[derive(Clone, Debug)]
pub struct ActionHandle {
    event: EventHandle,
    entity: EntityId,
    admission: AdmissionPolicy,
    interruption: InterruptionPolicy,
}

impl ActionHandle {
    /// The action's event handle.
    pub fn event(&self) -> &EventHandle {
        &self.event
    }

    /// Owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Admission policy.
    pub fn admission(&self) -> AdmissionPolicy {
        self.admission
    }

    /// Interruption policy.
    pub fn interruption(&self) -> InterruptionPolicy {
        self.interruption
    }

    /// Whether the action may still execute.
    pub fn is_running(&self) -> bool {
        self.event.is_running()
    }

    /// Stop the action. Idempotent.
    pub fn stop(&self) -> bool {
        self.event.stop()
    }
}

/// A game action waiting to be queued.
pub struct Action {
    handle: ActionHandle,
    body: Box<dyn Event>,
}

impl Action {
    /// An action for `entity` that fires every `delay_ms` once dispatched.
    pub fn new(
        entity: EntityId,
        delay_ms: u64,
        admission: AdmissionPolicy,
        interruption: InterruptionPolicy,
        body: impl Event + 'static,
    ) -> Self {
        Self {
            handle: ActionHandle {
                event: EventHandle::new(delay_ms),
                entity,
                admission,
                interruption,
            },
            body: Box::new(body),
        }
    }

    /// The queue-side handle.
    pub fn handle(&self) -> &ActionHandle {
        &self.handle
    }

    /// Owning entity.
    pub fn entity(&self) -> EntityId {
        self.handle.entity
    }

    /// Admission policy.
    pub fn admission(&self) -> AdmissionPolicy {
        self.handle.admission
    }

    /// Interruption policy.
    pub fn interruption(&self) -> InterruptionPolicy {
        self.handle.interruption
    }

    /// Whether the action may still execute.
    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Stop the action. Idempotent.
    pub fn stop(&self) -> bool {
        self.handle.stop()
    }

    /// Split into the queue-side handle and the schedulable event.
    pub(crate) fn into_parts(self) -> (ActionHandle, RecurringEvent) {
        let event = RecurringEvent::with_handle(self.handle.event.clone(), self.body);
        (self.handle, event)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("entity", &self.handle.entity)
            .field("name", &self.body.name())
            .field("admission", &self.handle.admission)
            .field("interruption", &self.handle.interruption)
            .field("running", &self.is_running())
            .finish()
    }
}
