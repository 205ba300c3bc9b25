//! Fixed-rate tick engine for the tock world server.
//!
//! A single logic thread owns the [`EventManager`] and runs every
//! scheduled [`Event`] in turn. The most important one is the world
//! [`TickEvent`], fired every 600ms by default, which advances every
//! entity in three phases and fans the per-player work out to the worker
//! pool. Game actions ride on the same machinery: an [`Action`] is a
//! recurring event owned by its entity's [`ActionQueue`], dispatched one
//! at a time.
//!
//! [`GameEngine`] wires it together and is the usual entry point.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod action_queue;
pub mod config;
pub mod cooldown;
pub mod engine;
pub mod event;
pub mod event_manager;
pub mod intent;
pub mod logic_thread;
pub mod metrics;
pub mod tick;
pub mod world;

pub use action::{Action, ActionHandle, AdmissionPolicy, InterruptionPolicy};
pub use action_queue::{ActionQueue, EnqueueOutcome};
pub use config::{ConfigError, EngineConfig};
pub use cooldown::{Cooldown, Cooldowns};
pub use engine::{GameEngine, ShutdownReport, SubmitError};
pub use event::{from_fn, Event, EventContext, EventError, EventHandle, RecurringEvent};
pub use event_manager::EventManager;
pub use intent::Intent;
pub use logic_thread::{EventSubmitter, LogicMessage, Services};
pub use metrics::{EventStats, TickMetrics, TickStats};
pub use tick::TickEvent;
pub use world::npc::{Npc, NpcDefinition};
pub use world::player::Player;
pub use world::session::Session;
pub use world::update::{PlayerUpdate, UpdateBlock, UpdateFlag};
pub use world::{MobRef, World};
