//! Recurring events: a body, a mutable delay, and a running flag.
//!
//! An [`EventHandle`] is the shared control surface of one scheduled
//! event. Any thread may read or change the delay, or stop the event;
//! the event manager reads both after every execution to decide whether
//! and when the event fires again. Once stopped, an event is never
//! executed again.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tock_core::error::{DelayError, TaskError};
use tock_core::Millis;
use tock_task::TaskScheduler;

use crate::logic_thread::{EventSubmitter, Services};
use crate::world::World;

// ── EventError ─────────────────────────────────────────────────────

/// Failure of one event execution.
///
/// Returned to the event manager, which logs it and keeps the event
/// scheduled unless the body also stopped it.
#[derive(Debug)]
pub enum EventError {
    /// A task executed by the body failed.
    Task(TaskError),
    /// The body tried to set an invalid delay.
    Delay(DelayError),
    /// Any other failure reported by the body.
    Failed {
        /// Human-readable description.
        reason: String,
    },
}

impl EventError {
    /// Convenience constructor for [`EventError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(e) => write!(f, "task: {e}"),
            Self::Delay(e) => write!(f, "delay: {e}"),
            Self::Failed { reason } => write!(f, "{reason}"),
        }
    }
}

impl Error for EventError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Task(e) => Some(e),
            Self::Delay(e) => Some(e),
            Self::Failed { .. } => None,
        }
    }
}

impl From<TaskError> for EventError {
    fn from(e: TaskError) -> Self {
        Self::Task(e)
    }
}

impl From<DelayError> for EventError {
    fn from(e: DelayError) -> Self {
        Self::Delay(e)
    }
}

// ── EventHandle ────────────────────────────────────────────────────

type StopHook = Box<dyn Fn() + Send + Sync>;

struct EventState {
    delay_ms: AtomicU64,
    running: AtomicBool,
    stop_hook: OnceLock<StopHook>,
}

/// Shared delay and running flag of one event.
#[derive(Clone)]
pub struct EventHandle {
    state: Arc<EventState>,
}

impl EventHandle {
    /// A running handle with the given delay.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            state: Arc::new(EventState {
                delay_ms: AtomicU64::new(delay_ms),
                running: AtomicBool::new(true),
                stop_hook: OnceLock::new(),
            }),
        }
    }

    /// Current delay in milliseconds.
    pub fn delay(&self) -> u64 {
        self.state.delay_ms.load(Ordering::Acquire)
    }

    /// Change the delay used for the next reschedule.
    ///
    /// A negative delay is rejected and the previous delay is kept.
    pub fn set_delay(&self, delay_ms: i64) -> Result<(), DelayError> {
        let delay = u64::try_from(delay_ms).map_err(|_| DelayError::Negative { delay_ms })?;
        self.state.delay_ms.store(delay, Ordering::Release);
        Ok(())
    }

    /// Whether the event may still execute.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Stop the event. Idempotent.
    ///
    /// Returns `true` for the call that actually stopped it. That call
    /// also fires the stop hook, if one is attached.
    pub fn stop(&self) -> bool {
        let was_running = self.state.running.swap(false, Ordering::AcqRel);
        if was_running {
            if let Some(hook) = self.state.stop_hook.get() {
                hook();
            }
        }
        was_running
    }

    /// Attach the hook fired by the first [`stop`](Self::stop). Only one
    /// hook can ever be attached; returns `false` if one already was.
    pub(crate) fn set_stop_hook(&self, hook: StopHook) -> bool {
        self.state.stop_hook.set(hook).is_ok()
    }

    /// Whether both handles control the same event.
    pub fn ptr_eq(&self, other: &EventHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandle")
            .field("delay_ms", &self.delay())
            .field("running", &self.is_running())
            .finish()
    }
}

// ── EventContext ───────────────────────────────────────────────────

/// What an event body can reach while it runs on the logic thread.
pub struct EventContext<'a> {
    handle: &'a EventHandle,
    now: Millis,
    services: &'a Services,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(handle: &'a EventHandle, now: Millis, services: &'a Services) -> Self {
        Self {
            handle,
            now,
            services,
        }
    }

    /// The running event's own handle.
    pub fn handle(&self) -> &EventHandle {
        self.handle
    }

    /// Clock reading taken just before the body started.
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Stop the running event after this execution.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// The world.
    pub fn world(&self) -> &'a Arc<World> {
        &self.services.world
    }

    /// The task scheduler.
    pub fn scheduler(&self) -> &'a TaskScheduler {
        &self.services.scheduler
    }

    /// Sender for follow-up events and queue signals.
    pub fn submitter(&self) -> &'a EventSubmitter {
        &self.services.submitter
    }

    /// All shared services.
    pub fn services(&self) -> &'a Services {
        self.services
    }
}

// ── Event ──────────────────────────────────────────────────────────

/// The body of a recurring event.
pub trait Event: Send {
    /// Run once. Called only on the logic thread and never while the
    /// event is stopped.
    fn execute(&mut self, ctx: &EventContext<'_>) -> Result<(), EventError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapter turning a closure into an [`Event`].
pub struct FnEvent<F> {
    name: &'static str,
    f: F,
}

impl<F> Event for FnEvent<F>
where
    F: FnMut(&EventContext<'_>) -> Result<(), EventError> + Send,
{
    fn execute(&mut self, ctx: &EventContext<'_>) -> Result<(), EventError> {
        (self.f)(ctx)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Build an [`Event`] from a closure.
pub fn from_fn<F>(name: &'static str, f: F) -> FnEvent<F>
where
    F: FnMut(&EventContext<'_>) -> Result<(), EventError> + Send,
{
    FnEvent { name, f }
}

// ── RecurringEvent ─────────────────────────────────────────────────

/// A body paired with its handle, ready to be submitted.
pub struct RecurringEvent {
    handle: EventHandle,
    body: Box<dyn Event>,
}

impl RecurringEvent {
    /// A running event first firing after `delay_ms`.
    pub fn new(delay_ms: u64, body: impl Event + 'static) -> Self {
        Self::with_handle(EventHandle::new(delay_ms), Box::new(body))
    }

    /// Pair an existing handle with a body.
    pub fn with_handle(handle: EventHandle, body: Box<dyn Event>) -> Self {
        Self { handle, body }
    }

    /// The event's handle.
    pub fn handle(&self) -> &EventHandle {
        &self.handle
    }

    /// Name of the body, for logs.
    pub fn name(&self) -> &str {
        self.body.name()
    }

    pub(crate) fn execute(&mut self, ctx: &EventContext<'_>) -> Result<(), EventError> {
        self.body.execute(ctx)
    }
}

impl fmt::Debug for RecurringEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecurringEvent")
            .field("name", &self.name())
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn negative_delay_keeps_previous_value() {
        let handle = EventHandle::new(600);
        assert_eq!(
            handle.set_delay(-1),
            Err(DelayError::Negative { delay_ms: -1 })
        );
        assert_eq!(handle.delay(), 600);
        handle.set_delay(0).unwrap();
        assert_eq!(handle.delay(), 0);
    }

    #[test]
    fn stop_is_idempotent_and_hook_fires_once() {
        let handle = EventHandle::new(10);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        assert!(handle.set_stop_hook(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        assert!(!handle.set_stop_hook(Box::new(|| {})));

        assert!(handle.stop());
        assert!(!handle.stop());
        assert!(!handle.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_state() {
        let a = EventHandle::new(5);
        let b = a.clone();
        b.set_delay(9).unwrap();
        a.stop();
        assert_eq!(a.delay(), 9);
        assert!(!b.is_running());
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&EventHandle::new(5)));
    }

    #[test]
    fn event_error_sources() {
        let err = EventError::from(DelayError::Negative { delay_ms: -3 });
        assert!(err.source().is_some());
        assert!(EventError::failed("x").source().is_none());
        assert_eq!(EventError::failed("boom").to_string(), "boom");
    }

    #[test]
    fn recurring_event_reports_body_name() {
        let event = RecurringEvent::new(1, from_fn("noop", |_ctx| Ok(())));
        assert_eq!(event.name(), "noop");
        assert!(event.handle().is_running());
    }
}
