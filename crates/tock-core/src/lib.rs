//! Core types for the tock world server.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the task scheduler and the engine: entity and tick
//! identifiers, the clock abstraction, tile geometry, chat messages, and the
//! error enums that cross crate boundaries.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod chat;
pub mod error;
pub mod geometry;
pub mod id;
pub mod time;

pub use chat::ChatMessage;
pub use error::{DelayError, RegisterError, TaskError, TaskFailure};
pub use geometry::{Direction, Location, RegionCoordinates};
pub use id::{EntityId, EntityKind, TickId};
pub use time::{Clock, Millis, MonotonicClock};
