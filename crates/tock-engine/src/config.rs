//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is the input to [`GameEngine::start`](crate::GameEngine::start).
//! [`validate()`](EngineConfig::validate) checks structural invariants
//! before any thread is spawned.

use std::error::Error;
use std::fmt;

use tock_task::PoolError;

/// Entity indices are 16-bit and index 0 is reserved.
pub const MAX_ENTITY_CAPACITY: usize = u16::MAX as usize - 1;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`EngineConfig::validate()`] or while starting the
/// engine's threads.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `tick_period_ms` is zero.
    ZeroTickPeriod,
    /// A capacity that must hold at least one element is zero.
    ZeroCapacity {
        /// Name of the offending field.
        field: &'static str,
    },
    /// An entity table is larger than 16-bit indices can address.
    CapacityOverflow {
        /// Name of the offending field.
        field: &'static str,
        /// The configured value.
        configured: usize,
    },
    /// `view_distance` is not positive.
    InvalidViewDistance {
        /// The configured value.
        value: i32,
    },
    /// The worker pool could not be built.
    Pool(PoolError),
    /// The logic thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroTickPeriod => write!(f, "tick_period_ms must be at least 1"),
            Self::ZeroCapacity { field } => write!(f, "{field} must be at least 1"),
            Self::CapacityOverflow { field, configured } => write!(
                f,
                "{field} {configured} exceeds the entity index limit of {MAX_ENTITY_CAPACITY}"
            ),
            Self::InvalidViewDistance { value } => {
                write!(f, "view_distance must be positive, got {value}")
            }
            Self::Pool(e) => write!(f, "worker pool: {e}"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for ConfigError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete configuration for a [`GameEngine`](crate::GameEngine).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of the world tick, in milliseconds. Default: 600.
    pub tick_period_ms: u64,
    /// Number of worker threads for parallel phases. `None` = auto-detect
    /// (`available_parallelism`, clamped to `[1, 64]`).
    pub worker_count: Option<usize>,
    /// Player table size. Default: 2000.
    pub max_players: usize,
    /// NPC table size. Default: 4000.
    pub max_npcs: usize,
    /// Per-entity action backlog bound. Default: 28, the inventory size.
    pub action_backlog_capacity: usize,
    /// Walking queue bound, in steps. Default: 50.
    pub walking_queue_capacity: usize,
    /// Tiles an entity can see in each direction. Default: 15.
    pub view_distance: i32,
    /// Ticks per rolling timing sample. Default: 100.
    pub benchmark_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 600,
            worker_count: None,
            max_players: 2000,
            max_npcs: 4000,
            action_backlog_capacity: 28,
            walking_queue_capacity: 50,
            view_distance: 15,
            benchmark_samples: 100,
        }
    }
}

impl EngineConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        for (field, value) in [
            ("max_players", self.max_players),
            ("max_npcs", self.max_npcs),
            ("action_backlog_capacity", self.action_backlog_capacity),
            ("walking_queue_capacity", self.walking_queue_capacity),
            ("benchmark_samples", self.benchmark_samples),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity { field });
            }
        }
        for (field, configured) in [("max_players", self.max_players), ("max_npcs", self.max_npcs)] {
            if configured > MAX_ENTITY_CAPACITY {
                return Err(ConfigError::CapacityOverflow { field, configured });
            }
        }
        if self.view_distance <= 0 {
            return Err(ConfigError::InvalidViewDistance {
                value: self.view_distance,
            });
        }
        Ok(())
    }

    /// Resolve the worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 64),
        }
    }
}
