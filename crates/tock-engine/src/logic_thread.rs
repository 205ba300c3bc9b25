//! The logic thread: sole owner of the [`EventManager`].
//!
//! Every scheduled event body runs here, one at a time. Other threads
//! never touch the schedule directly; they send [`LogicMessage`]s
//! through an [`EventSubmitter`] and the loop applies them between
//! event passes.
//!
//! ```text
//! any thread                         tock-logic
//!   | submitter.submit(event) ------>| recv_timeout(until next deadline)
//!   | submitter.advance(entity) ---->| try_recv() until empty
//!   | engine.send_intent(..) ------->| apply messages
//!   |                                | manager.run_due()
//!   |                                | publish event stats
//! ```

use std::fmt;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tock_core::{Clock, EntityId};
use tock_task::{panic_message, TaskScheduler};

use crate::engine::SubmitError;
use crate::event::RecurringEvent;
use crate::event_manager::EventManager;
use crate::intent::Intent;
use crate::metrics::{EventStats, Telemetry};
use crate::world::World;

/// A closure run once on the logic thread.
pub type LogicJob = Box<dyn FnOnce(&Services) + Send + 'static>;

/// Work handed to the logic thread.
pub enum LogicMessage {
    /// Schedule a recurring event.
    Submit(RecurringEvent),
    /// An entity's current action stopped; dispatch its next one.
    Advance(EntityId),
    /// Apply a decoded client request to a player.
    Intent(EntityId, Intent),
    /// A player's connection closed; unregister them.
    SessionClosed(EntityId),
    /// Run a closure with access to the shared services.
    Run(LogicJob),
    /// Leave the loop.
    Shutdown,
}

impl LogicMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::Advance(_) => "advance",
            Self::Intent(..) => "intent",
            Self::SessionClosed(_) => "session-closed",
            Self::Run(_) => "run",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Debug for LogicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submit(event) => f.debug_tuple("Submit").field(event).finish(),
            Self::Advance(id) => f.debug_tuple("Advance").field(id).finish(),
            Self::Intent(id, intent) => f.debug_tuple("Intent").field(id).field(intent).finish(),
            Self::SessionClosed(id) => f.debug_tuple("SessionClosed").field(id).finish(),
            Self::Run(_) => f.write_str("Run(..)"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// ── EventSubmitter ─────────────────────────────────────────────────

/// Cloneable, thread-safe handle for sending work to the logic thread.
#[derive(Clone, Debug)]
pub struct EventSubmitter(Sender<LogicMessage>);

impl EventSubmitter {
    /// A submitter and the receiving end of its unbounded channel.
    pub fn channel() -> (Self, Receiver<LogicMessage>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self(tx), rx)
    }

    /// Schedule `event` to fire after its delay.
    pub fn submit(&self, event: RecurringEvent) -> Result<(), SubmitError> {
        self.send(LogicMessage::Submit(event))
    }

    /// Ask the logic thread to dispatch `entity`'s next queued action.
    pub fn advance(&self, entity: EntityId) -> Result<(), SubmitError> {
        self.send(LogicMessage::Advance(entity))
    }

    /// Send any message.
    pub fn send(&self, message: LogicMessage) -> Result<(), SubmitError> {
        self.0.send(message).map_err(|_| SubmitError::Shutdown)
    }
}

// ── Services ───────────────────────────────────────────────────────

/// State shared by the logic thread and everything it runs.
#[derive(Clone, Debug)]
pub struct Services {
    /// The world.
    pub world: Arc<World>,
    /// Executor for tick phases.
    pub scheduler: Arc<TaskScheduler>,
    /// Sender back into the logic thread.
    pub submitter: EventSubmitter,
    /// Published counters.
    pub telemetry: Arc<Telemetry>,
}

impl Services {
    /// Bundle the shared services.
    pub fn new(
        world: Arc<World>,
        scheduler: Arc<TaskScheduler>,
        submitter: EventSubmitter,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            world,
            scheduler,
            submitter,
            telemetry,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        config: &crate::config::EngineConfig,
    ) -> (Self, Receiver<LogicMessage>) {
        let (submitter, rx) = EventSubmitter::channel();
        let services = Self::new(
            Arc::new(World::new(config)),
            Arc::new(TaskScheduler::new(2).unwrap()),
            submitter,
            Arc::new(Telemetry::new()),
        );
        (services, rx)
    }
}

// ── LogicThread ────────────────────────────────────────────────────

/// State moved onto the logic thread.
pub(crate) struct LogicThread {
    manager: EventManager,
    clock: Arc<dyn Clock>,
    rx: Receiver<LogicMessage>,
    services: Services,
}

impl LogicThread {
    pub(crate) fn new(clock: Arc<dyn Clock>, rx: Receiver<LogicMessage>, services: Services) -> Self {
        Self {
            manager: EventManager::new(Arc::clone(&clock)),
            clock,
            rx,
            services,
        }
    }

    /// Run until [`LogicMessage::Shutdown`] arrives or every sender is
    /// gone. Returns the final event counters.
    pub(crate) fn run(mut self) -> EventStats {
        tracing::debug!("logic thread started");
        'outer: loop {
            let first = match self.manager.next_deadline() {
                Some(deadline) => self.rx.recv_timeout(self.clock.now().until(deadline)),
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match first {
                Ok(message) => {
                    if self.handle(message).is_break() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            while let Ok(message) = self.rx.try_recv() {
                if self.handle(message).is_break() {
                    break 'outer;
                }
            }

            self.manager.run_due(&self.services);
            self.services.telemetry.publish_events(self.manager.stats());
        }
        let stats = self.manager.stats();
        self.services.telemetry.publish_events(stats);
        tracing::debug!(
            executed = stats.executed,
            pending = stats.pending,
            "logic thread stopped"
        );
        stats
    }

    /// Apply one message. A panic while applying it is logged and the
    /// loop carries on; only [`LogicMessage::Shutdown`] breaks out.
    fn handle(&mut self, message: LogicMessage) -> ControlFlow<()> {
        if matches!(message, LogicMessage::Shutdown) {
            return ControlFlow::Break(());
        }
        let kind = message.kind();
        let (manager, services) = (&mut self.manager, &self.services);
        if let Err(payload) =
            panic::catch_unwind(AssertUnwindSafe(|| apply(manager, services, message)))
        {
            tracing::error!(
                message = kind,
                panic = %panic_message(payload.as_ref()),
                "logic message panicked"
            );
        }
        ControlFlow::Continue(())
    }
}

fn apply(manager: &mut EventManager, services: &Services, message: LogicMessage) {
    match message {
        LogicMessage::Submit(event) => manager.submit(event),
        LogicMessage::Advance(entity) => {
            if let Some(mob) = services.world.mob(entity) {
                mob.actions().advance(&services.submitter);
            }
        }
        LogicMessage::Intent(entity, intent) => match services.world.player(entity) {
            Some(player) => intent.apply(&player, &services.submitter),
            None => tracing::debug!(%entity, "intent for unknown player dropped"),
        },
        LogicMessage::SessionClosed(entity) => {
            services.world.unregister_player(entity);
        }
        LogicMessage::Run(job) => job(services),
        LogicMessage::Shutdown => {}
    }
}
