//! tock: the tick engine of an MMO world server.
//!
//! This is the facade crate that re-exports the public API of the tock
//! sub-crates. For most users, adding `tock` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use tock::prelude::*;
//!
//! struct Discard;
//! impl Session for Discard {
//!     fn is_connected(&self) -> bool { true }
//!     fn close(&self) {}
//!     fn send_update(&self, _update: &PlayerUpdate) {}
//! }
//!
//! let config = EngineConfig { tick_period_ms: 50, ..EngineConfig::default() };
//! let world = Arc::new(World::new(&config));
//! let mut engine = GameEngine::start(config, world).unwrap();
//!
//! let player = engine
//!     .register_player("zezima", Arc::new(Discard), Location::new(3222, 3222, 0))
//!     .unwrap();
//! engine
//!     .send_intent(player.id(), Intent::Walk { steps: vec![(3225, 3222)], running: false })
//!     .unwrap();
//!
//! let report = engine.shutdown();
//! assert!(report.logic_joined);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tock-core` | IDs, time, geometry, chat, shared errors |
//! | [`task`] | `tock-task` | Task composition, worker pool, barrier scheduler |
//! | [`engine`] | `tock-engine` | Events, actions, world model, tick, runtime |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, clocks, and tile geometry (`tock-core`).
///
/// Contains [`types::EntityId`], [`types::Location`], the [`types::Clock`]
/// trait, and the error enums shared between crates.
pub use tock_core as types;

/// Task composition and barrier execution (`tock-task`).
///
/// Build [`task::Task`] trees and run them on a [`task::TaskScheduler`].
pub use tock_task as task;

/// Tick engine and world model (`tock-engine`).
///
/// [`engine::GameEngine`] runs the logic thread and worker pool;
/// [`engine::World`] holds the entities it advances.
pub use tock_engine as engine;

/// Common imports for typical tock usage.
///
/// ```rust
/// use tock::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tock_core::{
        ChatMessage, Clock, Direction, EntityId, Location, Millis, MonotonicClock, TickId,
    };

    // Errors
    pub use tock_core::{DelayError, RegisterError, TaskError, TaskFailure};
    pub use tock_engine::{ConfigError, EventError, SubmitError};

    // Tasks
    pub use tock_task::{Task, TaskScheduler};

    // Events and actions
    pub use tock_engine::{
        from_fn, Action, AdmissionPolicy, Event, EventContext, EventHandle,
        InterruptionPolicy, RecurringEvent,
    };

    // World and engine
    pub use tock_engine::{
        EngineConfig, GameEngine, Intent, NpcDefinition, PlayerUpdate, Session, World,
    };
}
