//! The world tick: one recurring event that advances every entity.
//!
//! Each firing sweeps out disconnected players, then builds and executes
//! a single sequential task of three phases:
//!
//! ```text
//! Sequential[
//!   tick   = Sequential[npc.., player..]       movement, chat, regions
//!   update = Parallel[Sequential[self, others]] one package per player
//!   reset  = Parallel[npc.., player..]          clear per-tick flags
//! ]
//! ```
//!
//! The tick phase is sequential because it moves entities between
//! regions. Update and reset leaves write only to their own entity.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tock_core::{EntityId, TickId};
use tock_task::{LeafResult, Task};

use crate::config::EngineConfig;
use crate::event::{Event, EventContext, EventError};
use crate::metrics::{TickMetrics, TickStats};
use crate::world::mob::Mob;
use crate::world::npc::Npc;
use crate::world::player::Player;
use crate::world::update::{PlayerUpdate, UpdateBlock, UpdateFlag};
use crate::world::World;

/// The recurring world tick.
#[derive(Debug)]
pub struct TickEvent {
    tick: TickId,
    period_ms: u64,
    stats: TickStats,
}

impl TickEvent {
    /// A tick event sized by `config`. Submit it with a delay of
    /// `config.tick_period_ms`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tick: TickId::default(),
            period_ms: config.tick_period_ms,
            stats: TickStats::new(config.benchmark_samples),
        }
    }

    /// The last tick started.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Rolling timing statistics.
    pub fn stats(&self) -> &TickStats {
        &self.stats
    }
}

impl Event for TickEvent {
    fn execute(&mut self, ctx: &EventContext<'_>) -> Result<(), EventError> {
        self.tick = self.tick.next();
        let tick = self.tick;
        let started = Instant::now();

        let world = Arc::clone(ctx.world());
        let swept = world.sweep_disconnected();
        let players = world.players();
        let npcs = world.npcs();
        let marks = Arc::new(PhaseMarks::default());
        let task = Task::sequential([
            marks.leaf(),
            tick_phase(&world, &players, &npcs),
            marks.leaf(),
            update_phase(tick, &world, &players),
            marks.leaf(),
            reset_phase(&players, &npcs),
            marks.leaf(),
        ]);
        let build = started.elapsed();

        let result = ctx.scheduler().execute(task);
        let total = started.elapsed();

        let phases = marks.durations();
        let metrics = TickMetrics {
            tick,
            build_us: micros(build),
            tick_phase_us: phases.first().copied().map_or(0, micros),
            update_phase_us: phases.get(1).copied().map_or(0, micros),
            reset_phase_us: phases.get(2).copied().map_or(0, micros),
            total_us: micros(total),
            players: players.len(),
            npcs: npcs.len(),
            overran: total >= Duration::from_millis(self.period_ms),
        };
        if metrics.overran {
            tracing::warn!(%tick, total_us = metrics.total_us, "tick overran its period");
        }
        tracing::debug!(
            %tick,
            swept,
            players = metrics.players,
            npcs = metrics.npcs,
            total_us = metrics.total_us,
            "tick complete"
        );
        self.stats.record(&metrics);
        ctx.services().telemetry.publish_tick(metrics);

        result.map_err(EventError::from)
    }

    fn name(&self) -> &str {
        "world-tick"
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Timestamps taken between phases.
#[derive(Debug, Default)]
struct PhaseMarks {
    marks: Mutex<SmallVec<[Instant; 4]>>,
}

impl PhaseMarks {
    fn leaf(self: &Arc<Self>) -> Task {
        let marks = Arc::clone(self);
        Task::leaf("phase-mark", move || {
            marks
                .marks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Instant::now());
            Ok(())
        })
    }

    fn durations(&self) -> SmallVec<[Duration; 3]> {
        let marks = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        marks.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

// ── Tick phase ─────────────────────────────────────────────────────

/// One sequential leaf per entity: NPCs first, then players.
pub fn tick_phase(world: &Arc<World>, players: &[Arc<Player>], npcs: &[Arc<Npc>]) -> Task {
    let npc_leaves = npcs.iter().map(|npc| {
        let world = Arc::clone(world);
        let npc = Arc::clone(npc);
        Task::leaf(format!("tick {}", npc.id()), move || {
            advance_mob(&world, npc.mob(), false);
            Ok(())
        })
    });
    let player_leaves = players.iter().map(|player| {
        let world = Arc::clone(world);
        let player = Arc::clone(player);
        Task::leaf(format!("tick {}", player.id()), move || {
            let spoke = {
                let mut chat = player.chat();
                chat.current = chat.queue.pop_front();
                chat.current.is_some()
            };
            advance_mob(&world, player.mob(), spoke);
            Ok(())
        })
    });
    Task::sequential(npc_leaves.chain(player_leaves).collect::<Vec<_>>())
}

fn advance_mob(world: &World, mob: &Mob, spoke: bool) {
    let walked = {
        let mut state = mob.state();
        if spoke {
            state.flags.flag(UpdateFlag::Chat);
        }
        state.process_movement()
    };
    if walked {
        mob.actions().clear_interruptible(true);
    }
    world.refresh_region(mob);
}

// ── Update phase ───────────────────────────────────────────────────

/// One `Sequential(self, others)` per player, all in parallel.
pub fn update_phase(tick: TickId, world: &Arc<World>, players: &[Arc<Player>]) -> Task {
    Task::parallel(players.iter().map(|player| {
        let own = {
            let player = Arc::clone(player);
            Task::leaf(format!("self-block {}", player.id()), move || {
                self_block(tick, &player);
                Ok(())
            })
        };
        let others = {
            let world = Arc::clone(world);
            let player = Arc::clone(player);
            Task::leaf(format!("visible-block {}", player.id()), move || {
                visible_blocks(tick, &world, &player)
            })
        };
        Task::sequential([own, others])
    }))
}

fn self_block(tick: TickId, player: &Player) {
    let mut own = {
        let state = player.mob().state();
        let mut block = state.block(player.id());
        block.map_region_changed = state.map_region_changing;
        block
    };
    own.chat = player.chat().current.clone();
    *player.update_slot() = Some(PlayerUpdate::new(tick, own));
}

fn visible_blocks(tick: TickId, world: &World, player: &Player) -> LeafResult {
    let me = player.id();
    let here = player.location();
    let distance = world.view_distance();
    let hood = world.regions().neighbourhood(here.region());

    let observe = |id: EntityId| -> Option<UpdateBlock> {
        let mob = world.mob(id)?;
        let block = {
            let state = mob.state();
            if !here.is_within_distance(state.location, distance) {
                return None;
            }
            state.block(id)
        };
        Some(block)
    };

    let mut others = Vec::new();
    for id in hood.players.into_iter().filter(|&id| id != me) {
        let Some(mut block) = observe(id) else {
            continue;
        };
        if let Some(other) = world.player(id) {
            block.chat = other.chat().current.clone();
        }
        others.push(block);
    }
    let npcs: Vec<UpdateBlock> = hood.npcs.into_iter().filter_map(observe).collect();

    let mut slot = player.update_slot();
    let update = slot
        .as_mut()
        .filter(|u| u.tick == tick)
        .ok_or("own update block missing for this tick")?;
    update.others = others;
    update.npcs = npcs;
    player.session().send_update(update);
    Ok(())
}

// ── Reset phase ────────────────────────────────────────────────────

/// One parallel leaf per entity clearing its per-tick state.
pub fn reset_phase(players: &[Arc<Player>], npcs: &[Arc<Npc>]) -> Task {
    let npc_leaves = npcs.iter().map(|npc| {
        let npc = Arc::clone(npc);
        Task::leaf(format!("reset {}", npc.id()), move || {
            npc.mob().state().reset_tick_flags();
            Ok(())
        })
    });
    let player_leaves = players.iter().map(|player| {
        let player = Arc::clone(player);
        Task::leaf(format!("reset {}", player.id()), move || {
            player.mob().state().reset_tick_flags();
            player.chat().current = None;
            Ok(())
        })
    });
    Task::parallel(npc_leaves.chain(player_leaves).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tock_core::{ChatMessage, Location};
    use tock_task::TaskScheduler;

    use crate::world::npc::NpcDefinition;
    use crate::world::session::Session;

    #[derive(Default)]
    struct Capture {
        updates: Mutex<Vec<PlayerUpdate>>,
        sent: AtomicUsize,
    }

    impl Session for Capture {
        fn is_connected(&self) -> bool {
            true
        }
        fn close(&self) {}
        fn send_update(&self, update: &PlayerUpdate) {
            self.sent.fetch_add(1, Ordering::SeqCst);
            self.updates.lock().unwrap().push(update.clone());
        }
    }

    fn world() -> Arc<World> {
        Arc::new(World::new(&EngineConfig::default()))
    }

    fn run_tick(scheduler: &TaskScheduler, world: &Arc<World>, tick: TickId) {
        let players = world.players();
        let npcs = world.npcs();
        scheduler
            .execute(Task::sequential([
                tick_phase(world, &players, &npcs),
                update_phase(tick, world, &players),
                reset_phase(&players, &npcs),
            ]))
            .unwrap();
    }

    #[test]
    fn chat_is_spoken_for_exactly_one_tick() {
        let scheduler = TaskScheduler::new(2).unwrap();
        let world = world();
        let session = Arc::new(Capture::default());
        let player = world
            .register_player("talker", session.clone(), Location::new(3200, 3200, 0))
            .unwrap();
        player.chat().queue.push_back(ChatMessage::new(0, 0, b"hi".to_vec()));

        run_tick(&scheduler, &world, TickId(1));
        run_tick(&scheduler, &world, TickId(2));

        let updates = session.updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].own.chat.is_some());
        assert!(updates[0].own.flags.get(UpdateFlag::Chat));
        assert!(updates[1].own.chat.is_none());
        assert!(!updates[1].own.flags.is_update_required());
    }

    #[test]
    fn nearby_entities_are_visible_far_ones_are_not() {
        let scheduler = TaskScheduler::new(2).unwrap();
        let world = world();
        let a = Arc::new(Capture::default());
        let here = Location::new(3200, 3200, 0);
        world.register_player("a", a.clone(), here).unwrap();
        let near = world
            .register_player("near", Arc::new(Capture::default()), here.transform(3, 3, 0))
            .unwrap();
        let far = world
            .register_player("far", Arc::new(Capture::default()), here.transform(40, 0, 0))
            .unwrap();
        let guard = Arc::new(NpcDefinition {
            id: 9,
            name: "guard".into(),
            size: 1,
        });
        let npc = world.register_npc(guard, here.transform(-2, 0, 0)).unwrap();

        run_tick(&scheduler, &world, TickId(1));

        let updates = a.updates.lock().unwrap();
        let update = &updates[0];
        assert!(update.contains(near.id()));
        assert!(!update.contains(far.id()));
        assert_eq!(update.npcs.len(), 1);
        assert_eq!(update.npcs[0].entity, npc.id());
    }

    #[test]
    fn walking_moves_one_tile_and_updates_region() {
        let scheduler = TaskScheduler::new(1).unwrap();
        let world = world();
        // One tile west of a region boundary.
        let start = Location::new(3199, 3200, 0);
        let player = world
            .register_player("walker", Arc::new(Capture::default()), start)
            .unwrap();
        {
            let mut state = player.mob().state();
            state.walking.reset(start);
            state.walking.add_step(3201, 3200);
        }
        run_tick(&scheduler, &world, TickId(1));
        assert_eq!(player.location(), Location::new(3200, 3200, 0));
        let hood = world.regions().neighbourhood(Location::new(3200, 3200, 0).region());
        assert_eq!(hood.players, vec![player.id()]);
        assert!(world.regions().region(start.region()).is_none());
    }

    #[test]
    fn every_connected_player_gets_one_update_per_tick() {
        let scheduler = TaskScheduler::new(4).unwrap();
        let world = world();
        let sessions: Vec<Arc<Capture>> = (0..20).map(|_| Arc::new(Capture::default())).collect();
        for (i, s) in sessions.iter().enumerate() {
            world
                .register_player(
                    &format!("p{i}"),
                    s.clone(),
                    Location::new(3200 + (i % 5) as i32, 3200 + (i / 5) as i32, 0),
                )
                .unwrap();
        }
        run_tick(&scheduler, &world, TickId(7));
        for s in &sessions {
            assert_eq!(s.sent.load(Ordering::SeqCst), 1);
            assert_eq!(s.updates.lock().unwrap()[0].tick, TickId(7));
            assert_eq!(s.updates.lock().unwrap()[0].others.len(), 19);
        }
    }
}
