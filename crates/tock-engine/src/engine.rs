//! User-facing [`GameEngine`] API and shutdown sequence.
//!
//! # Architecture
//!
//! ```text
//! network / login threads        tock-logic              tock-worker-0..N
//!     |                              |                         |
//!     |--send_intent()-------------->| apply intent            |
//!     |--session_closed()----------->| unregister player       |
//!     |--submit()------------------->| schedule event          |
//!     |                              | run_due():              |
//!     |                              |   TickEvent ----------->| update / reset leaves
//!     |                              |   <---barrier-----------|
//!     |                              |   action + misc events  |
//!     |--shutdown()----------------->| leave loop, join        |
//!     |  join logic, then workers                              |
//! ```

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tock_core::{Clock, EntityId, Location, MonotonicClock, RegisterError};
use tock_task::TaskScheduler;

use crate::config::{ConfigError, EngineConfig};
use crate::event::RecurringEvent;
use crate::intent::Intent;
use crate::logic_thread::{EventSubmitter, LogicMessage, LogicThread, Services};
use crate::metrics::{EventStats, Telemetry, TickMetrics};
use crate::tick::TickEvent;
use crate::world::player::Player;
use crate::world::session::Session;
use crate::world::World;

// ── Error types ────────────────────────────────────────────────────

/// Error sending work to the logic thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The logic thread has shut down.
    Shutdown,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "logic thread has shut down"),
        }
    }
}

impl std::error::Error for SubmitError {}

// ── ShutdownReport ─────────────────────────────────────────────────

/// Report from [`GameEngine::shutdown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent shutting down.
    pub total_ms: u64,
    /// Whether the logic thread was joined without panicking.
    pub logic_joined: bool,
    /// Number of worker threads joined.
    pub workers_joined: usize,
}

// ── GameEngine ─────────────────────────────────────────────────────

/// A running world: the logic thread, the worker pool, and the world
/// they advance.
pub struct GameEngine {
    services: Services,
    logic: Option<JoinHandle<EventStats>>,
    config: EngineConfig,
    stopped: bool,
}

impl GameEngine {
    /// Validate `config`, spawn the worker pool and the logic thread, and
    /// schedule the world tick every `config.tick_period_ms`.
    pub fn start(config: EngineConfig, world: Arc<World>) -> Result<Self, ConfigError> {
        Self::start_with_clock(config, world, Arc::new(MonotonicClock::new()))
    }

    /// [`start`](Self::start) with a caller-supplied clock.
    pub fn start_with_clock(
        config: EngineConfig,
        world: Arc<World>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let workers = config.resolved_worker_count();
        let scheduler = Arc::new(TaskScheduler::new(workers)?);
        let (submitter, rx) = EventSubmitter::channel();
        let services = Services::new(
            world,
            Arc::clone(&scheduler),
            submitter,
            Arc::new(Telemetry::new()),
        );

        // Queued before the thread starts, so the tick is the first event.
        let tick = RecurringEvent::new(config.tick_period_ms, TickEvent::new(&config));
        services
            .submitter
            .submit(tick)
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        let logic = LogicThread::new(clock, rx, services.clone());
        let handle = match thread::Builder::new()
            .name("tock-logic".into())
            .spawn(move || logic.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                scheduler.shutdown();
                return Err(ConfigError::ThreadSpawnFailed {
                    reason: format!("tock-logic: {e}"),
                });
            }
        };

        tracing::info!(
            tick_period_ms = config.tick_period_ms,
            workers,
            "engine started"
        );
        Ok(Self {
            services,
            logic: Some(handle),
            config,
            stopped: false,
        })
    }

    /// The configuration the engine was started with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The world being advanced.
    pub fn world(&self) -> &Arc<World> {
        &self.services.world
    }

    /// A cloneable sender into the logic thread.
    pub fn submitter(&self) -> &EventSubmitter {
        &self.services.submitter
    }

    /// Schedule a recurring event.
    pub fn submit(&self, event: RecurringEvent) -> Result<(), SubmitError> {
        self.services.submitter.submit(event)
    }

    /// Run `job` once on the logic thread, between event passes.
    pub fn submit_logic<F>(&self, job: F) -> Result<(), SubmitError>
    where
        F: FnOnce(&Services) + Send + 'static,
    {
        self.services.submitter.send(LogicMessage::Run(Box::new(job)))
    }

    /// Register a player directly with the world.
    pub fn register_player(
        &self,
        name: &str,
        session: Arc<dyn Session>,
        location: Location,
    ) -> Result<Arc<Player>, RegisterError> {
        self.services.world.register_player(name, session, location)
    }

    /// Forward a decoded client request for `player`.
    pub fn send_intent(&self, player: EntityId, intent: Intent) -> Result<(), SubmitError> {
        self.services
            .submitter
            .send(LogicMessage::Intent(player, intent))
    }

    /// Report that `player`'s connection closed.
    pub fn session_closed(&self, player: EntityId) -> Result<(), SubmitError> {
        self.services
            .submitter
            .send(LogicMessage::SessionClosed(player))
    }

    /// Event counters as of the last logic-thread pass.
    pub fn event_stats(&self) -> EventStats {
        self.services.telemetry.event_stats()
    }

    /// Metrics of the most recent tick.
    pub fn last_tick(&self) -> Option<TickMetrics> {
        self.services.telemetry.last_tick()
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop the logic thread, then the worker pool. Idempotent.
    ///
    /// Events still scheduled are dropped without running again.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.stopped {
            return ShutdownReport {
                total_ms: 0,
                logic_joined: true,
                workers_joined: 0,
            };
        }
        self.stopped = true;
        let start = Instant::now();

        // A send failure means the logic thread already exited.
        let _ = self.services.submitter.send(LogicMessage::Shutdown);
        let logic_joined = match self.logic.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        };
        let workers_joined = self.services.scheduler.shutdown();

        let total_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let stats = self.services.telemetry.event_stats();
        tracing::info!(
            total_ms,
            logic_joined,
            workers_joined,
            events_executed = stats.executed,
            "engine stopped"
        );
        ShutdownReport {
            total_ms,
            logic_joined,
            workers_joined,
        }
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        if !self.stopped {
            self.shutdown();
        }
    }
}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("config", &self.config)
            .field("world", &self.services.world)
            .field("stopped", &self.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            tick_period_ms: 10,
            worker_count: Some(2),
            ..EngineConfig::default()
        }
    }

    fn start(config: EngineConfig) -> GameEngine {
        let world = Arc::new(World::new(&config));
        GameEngine::start(config, world).unwrap()
    }

    #[test]
    fn lifecycle_start_tick_and_shutdown() {
        let mut engine = start(fast_config());
        let deadline = Instant::now() + Duration::from_secs(2);
        while engine.last_tick().is_none() {
            assert!(Instant::now() < deadline, "no tick within 2s");
            thread::sleep(Duration::from_millis(5));
        }
        let report = engine.shutdown();
        assert!(report.logic_joined);
        assert_eq!(report.workers_joined, 2);
        assert!(engine.is_stopped());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut engine = start(fast_config());
        engine.shutdown();
        let second = engine.shutdown();
        assert_eq!(second.total_ms, 0);
        assert_eq!(second.workers_joined, 0);
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let mut engine = start(fast_config());
        engine.shutdown();
        assert_eq!(engine.submit_logic(|_| {}), Err(SubmitError::Shutdown));
    }

    #[test]
    fn invalid_config_spawns_nothing() {
        let config = EngineConfig {
            tick_period_ms: 0,
            ..EngineConfig::default()
        };
        let world = Arc::new(World::new(&EngineConfig::default()));
        assert_eq!(
            GameEngine::start(config, world).unwrap_err(),
            ConfigError::ZeroTickPeriod
        );
    }

    #[test]
    fn drop_triggers_shutdown() {
        let engine = start(fast_config());
        thread::sleep(Duration::from_millis(20));
        drop(engine);
    }

    #[test]
    fn slow_tick_period_does_not_delay_shutdown() {
        let mut engine = start(EngineConfig {
            tick_period_ms: 60_000,
            worker_count: Some(1),
            ..EngineConfig::default()
        });
        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        engine.shutdown();
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
