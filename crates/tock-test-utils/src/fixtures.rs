//! World fixtures.
//!
//! - [`populated_world`]: players and NPCs scattered by a seeded RNG.
//! - [`test_services`]: the shared services without a running engine.
//! - [`fast_config`]: a short tick period for tests that run the engine.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tock_core::Location;
use tock_engine::{
    EngineConfig, EventSubmitter, LogicMessage, NpcDefinition, Player, Services, World,
};
use tock_engine::metrics::Telemetry;
use tock_task::TaskScheduler;

use crate::MockSession;

/// Lumbridge, where fixtures gather their entities.
pub const SPAWN: Location = Location::new(3222, 3222, 0);

/// A config ticking every 20ms on two workers.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        tick_period_ms: 20,
        worker_count: Some(2),
        ..EngineConfig::default()
    }
}

/// Services over a fresh world, plus the receiving end of the submitter.
pub fn test_services(config: &EngineConfig) -> (Services, Receiver<LogicMessage>) {
    let (submitter, rx) = EventSubmitter::channel();
    let scheduler = TaskScheduler::new(config.resolved_worker_count())
        .unwrap_or_else(|e| panic!("worker pool: {e}"));
    let services = Services::new(
        Arc::new(World::new(config)),
        Arc::new(scheduler),
        submitter,
        Arc::new(Telemetry::new()),
    );
    (services, rx)
}

/// A registered player and the mock session backing them.
pub type Connected = (Arc<Player>, Arc<MockSession>);

/// Register `players` players and `npcs` NPCs within `spread` tiles of
/// [`SPAWN`], positions drawn from `seed`.
pub fn populated_world(
    config: &EngineConfig,
    players: usize,
    npcs: usize,
    spread: i32,
    seed: u64,
) -> (Arc<World>, Vec<Connected>) {
    let world = Arc::new(World::new(config));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut scatter = || {
        SPAWN.transform(
            rng.random_range(-spread..=spread),
            rng.random_range(-spread..=spread),
            0,
        )
    };

    let connected = (0..players)
        .map(|i| {
            let session = MockSession::new();
            let player = world
                .register_player(&format!("bot{i}"), session.clone(), scatter())
                .unwrap_or_else(|e| panic!("registering bot{i}: {e}"));
            (player, session)
        })
        .collect();

    let goblin = Arc::new(NpcDefinition {
        id: 101,
        name: "goblin".into(),
        size: 1,
    });
    for _ in 0..npcs {
        world
            .register_npc(Arc::clone(&goblin), scatter())
            .unwrap_or_else(|e| panic!("spawning npc: {e}"));
    }
    (world, connected)
}
