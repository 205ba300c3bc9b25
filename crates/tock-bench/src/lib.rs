//! Benchmark profiles for the tock tick engine.
//!
//! - [`reference_profile`]: the default 600ms world with a 2000-player cap
//! - [`crowd`]: a seeded world with players packed around one spawn point
//! - [`scatter_paths`]: give every player a seeded walk for the next ticks

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tock_core::Location;
use tock_engine::{EngineConfig, NpcDefinition, PlayerUpdate, Session, World};

/// Where crowds gather.
pub const SPAWN: Location = Location::new(3222, 3222, 0);

/// A session that drops every update.
#[derive(Debug)]
pub struct NullSession;

impl Session for NullSession {
    fn is_connected(&self) -> bool {
        true
    }

    fn close(&self) {}

    fn send_update(&self, update: &PlayerUpdate) {
        std::hint::black_box(update);
    }
}

/// The default engine configuration.
pub fn reference_profile() -> EngineConfig {
    EngineConfig::default()
}

/// A world with `players` players and `npcs` NPCs scattered within
/// `spread` tiles of [`SPAWN`]. Positions depend only on `seed`.
pub fn crowd(config: &EngineConfig, players: usize, npcs: usize, spread: i32, seed: u64) -> Arc<World> {
    let world = Arc::new(World::new(config));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let session: Arc<dyn Session> = Arc::new(NullSession);

    for i in 0..players {
        let at = SPAWN.transform(
            rng.random_range(-spread..=spread),
            rng.random_range(-spread..=spread),
            0,
        );
        if world.register_player(&format!("bench{i}"), Arc::clone(&session), at).is_err() {
            break;
        }
    }

    let rat = Arc::new(NpcDefinition {
        id: 47,
        name: "rat".into(),
        size: 1,
    });
    for _ in 0..npcs {
        let at = SPAWN.transform(
            rng.random_range(-spread..=spread),
            rng.random_range(-spread..=spread),
            0,
        );
        if world.register_npc(Arc::clone(&rat), at).is_err() {
            break;
        }
    }
    world
}

/// Queue a random path of up to `length` tiles for every player.
pub fn scatter_paths(world: &World, length: i32, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for player in world.players() {
        let mut state = player.mob().state();
        let here = state.location;
        state.walking.reset(here);
        state.walking.set_running(rng.random_bool(0.5));
        state.walking.add_step(
            here.x + rng.random_range(-length..=length),
            here.y + rng.random_range(-length..=length),
        );
    }
}
