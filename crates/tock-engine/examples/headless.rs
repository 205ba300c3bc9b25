//! Run a small world with bot players for a few seconds and print tick
//! timings.
//!
//! ```text
//! RUST_LOG=tock_engine=debug cargo run -p tock-engine --example headless
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tock_core::{ChatMessage, EntityId, Location};
use tock_engine::{
    EngineConfig, GameEngine, Intent, NpcDefinition, PlayerUpdate, Session, World,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// A bot connection that discards its updates.
struct Bot;

impl Session for Bot {
    fn is_connected(&self) -> bool {
        true
    }

    fn close(&self) {}

    fn send_update(&self, _update: &PlayerUpdate) {}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig {
        tick_period_ms: 100,
        benchmark_samples: 10,
        ..EngineConfig::default()
    };
    let world = Arc::new(World::new(&config));
    let home = Location::new(3222, 3222, 0);

    let cow = Arc::new(NpcDefinition {
        id: 81,
        name: "cow".into(),
        size: 2,
    });
    for i in 0..50 {
        world.register_npc(Arc::clone(&cow), home.transform(i % 10, i / 10, 0))?;
    }

    let mut engine = GameEngine::start(config, world)?;
    let mut bots: Vec<EntityId> = Vec::new();
    for i in 0..200 {
        let at = home.transform(i % 20 - 10, i / 20 - 5, 0);
        bots.push(engine.register_player(&format!("bot{i}"), Arc::new(Bot), at)?.id());
    }

    for round in 0..30 {
        for (i, &bot) in bots.iter().enumerate() {
            let offset = if (round + i) % 2 == 0 { 4 } else { -4 };
            engine.send_intent(
                bot,
                Intent::Walk {
                    steps: vec![(home.x + offset, home.y + offset)],
                    running: i % 3 == 0,
                },
            )?;
            if i % 25 == round % 25 {
                engine.send_intent(bot, Intent::Chat(ChatMessage::new(0, 0, b"hello".to_vec())))?;
            }
        }
        thread::sleep(Duration::from_millis(100));
    }

    if let Some(last) = engine.last_tick() {
        println!(
            "tick {}: {} players, {} npcs, {}us total ({}us tick, {}us update, {}us reset)",
            last.tick,
            last.players,
            last.npcs,
            last.total_us,
            last.tick_phase_us,
            last.update_phase_us,
            last.reset_phase_us
        );
    }
    let stats = engine.event_stats();
    println!(
        "events: {} executed, {} failed, {} overruns, worst lateness {}ms",
        stats.executed, stats.failed, stats.overruns, stats.worst_lateness_ms
    );
    let report = engine.shutdown();
    println!("shutdown in {}ms", report.total_ms);
    Ok(())
}
