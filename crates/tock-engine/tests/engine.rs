//! End-to-end runs of the engine with a real logic thread and worker pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tock_core::{ChatMessage, Location};
use tock_engine::{
    EngineConfig, GameEngine, Intent, PlayerUpdate, RecurringEvent, Session, World,
};
use tock_test_utils::fixtures::{fast_config, populated_world, SPAWN};
use tock_test_utils::{CountingEvent, MockSession};

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn start(config: EngineConfig) -> GameEngine {
    let world = Arc::new(World::new(&config));
    GameEngine::start(config, world).unwrap()
}

#[test]
fn every_player_receives_an_update_each_tick() {
    let config = fast_config();
    let (world, connected) = populated_world(&config, 16, 8, 6, 7);
    let mut engine = GameEngine::start(config, world).unwrap();

    wait_until("three ticks", || {
        connected.iter().all(|(_, session)| session.update_count() >= 3)
    });
    let metrics = engine.last_tick().unwrap();
    assert_eq!(metrics.players, 16);
    assert_eq!(metrics.npcs, 8);
    engine.shutdown();

    for (player, session) in &connected {
        let updates = session.updates();
        assert!(updates.windows(2).all(|w| w[0].tick < w[1].tick));
        let last = updates.last().unwrap();
        assert_eq!(last.own.entity, player.id());
        // Everyone is within 6 tiles of spawn, so all are mutually visible.
        assert_eq!(last.others.len(), 15);
        assert_eq!(last.npcs.len(), 8);
    }
}

#[test]
fn walk_intent_moves_one_tile_per_tick() {
    let mut engine = start(fast_config());
    let session = MockSession::new();
    let player = engine.register_player("walker", session.clone(), SPAWN).unwrap();
    engine
        .send_intent(
            player.id(),
            Intent::Walk {
                steps: vec![(SPAWN.x + 3, SPAWN.y)],
                running: false,
            },
        )
        .unwrap();

    let target = Location::new(SPAWN.x + 3, SPAWN.y, 0);
    wait_until("walk to finish", || player.location() == target);
    engine.shutdown();

    let path: Vec<Location> = session.updates().iter().map(|u| u.own.location).collect();
    // No update ever skips a tile.
    assert!(path.windows(2).all(|w| (w[1].x - w[0].x).abs() <= 1));
    assert!(path.contains(&Location::new(SPAWN.x + 1, SPAWN.y, 0)));
}

#[test]
fn extreme_walk_intent_keeps_the_world_ticking() {
    let mut engine = start(fast_config());
    let session = MockSession::new();
    let player = engine.register_player("edge", session.clone(), SPAWN).unwrap();
    wait_until("first update", || session.update_count() >= 1);

    engine
        .send_intent(
            player.id(),
            Intent::Walk {
                steps: vec![(i32::MIN, SPAWN.y), (i32::MAX, i32::MIN)],
                running: false,
            },
        )
        .unwrap();
    wait_until("the walk to start", || player.location().x < SPAWN.x);
    let seen = session.update_count();
    wait_until("more ticks", || session.update_count() >= seen + 3);

    let report = engine.shutdown();
    assert!(report.logic_joined);
    assert_eq!(player.location().y, SPAWN.y);
}

#[test]
fn chat_reaches_nearby_players() {
    let mut engine = start(fast_config());
    let speaker = engine
        .register_player("speaker", MockSession::new(), SPAWN)
        .unwrap();
    let listener_session = MockSession::new();
    engine
        .register_player("listener", listener_session.clone(), SPAWN.transform(2, 0, 0))
        .unwrap();

    let message = ChatMessage::new(0, 0, b"buying gf".to_vec());
    engine
        .send_intent(speaker.id(), Intent::Chat(message.clone()))
        .unwrap();
    wait_until("chat delivery", || {
        listener_session.updates().iter().any(|u| {
            u.others
                .iter()
                .any(|b| b.entity == speaker.id() && b.chat.as_ref() == Some(&message))
        })
    });
    engine.shutdown();
}

#[test]
fn disconnected_players_are_swept_and_sessions_closed() {
    let mut engine = start(fast_config());
    let stays = MockSession::new();
    let leaves = MockSession::new();
    engine.register_player("stays", stays.clone(), SPAWN).unwrap();
    engine.register_player("leaves", leaves.clone(), SPAWN).unwrap();

    leaves.disconnect();
    wait_until("sweep", || engine.world().player_count() == 1);
    assert_eq!(leaves.close_count(), 1);
    assert!(engine.world().find_player("stays").is_some());
    engine.shutdown();
}

#[test]
fn session_closed_unregisters_and_cancels_actions() {
    let mut engine = start(fast_config());
    let session = MockSession::new();
    let player = engine.register_player("quitter", session.clone(), SPAWN).unwrap();
    engine.session_closed(player.id()).unwrap();
    wait_until("unregister", || engine.world().player(player.id()).is_none());
    assert_eq!(session.close_count(), 1);
    assert!(player.mob().actions().is_idle());
    engine.shutdown();
}

/// A session whose update delivery always panics.
struct Broken {
    attempts: AtomicUsize,
}

impl Session for Broken {
    fn is_connected(&self) -> bool {
        true
    }

    fn close(&self) {}

    fn send_update(&self, _update: &PlayerUpdate) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        panic!("socket on fire");
    }
}

#[test]
fn failing_tick_does_not_stop_later_ticks() {
    let mut engine = start(fast_config());
    let broken = Arc::new(Broken {
        attempts: AtomicUsize::new(0),
    });
    engine.register_player("broken", broken.clone(), SPAWN).unwrap();
    let healthy = MockSession::new();
    engine
        .register_player("healthy", healthy.clone(), SPAWN.transform(1, 0, 0))
        .unwrap();

    wait_until("several failed ticks", || {
        broken.attempts.load(Ordering::SeqCst) >= 3
    });
    // The sibling update leaf still ran every tick.
    assert!(healthy.update_count() >= 2);
    assert!(engine.event_stats().failed >= 2);
    engine.shutdown();
}

#[test]
fn user_events_share_the_logic_thread_with_the_tick() {
    let mut engine = start(fast_config());
    let (event, count) = CountingEvent::with_limit(5);
    engine.submit(RecurringEvent::new(2, event)).unwrap();
    wait_until("five executions", || count.load(Ordering::SeqCst) == 5);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(count.load(Ordering::SeqCst), 5);
    engine.shutdown();
}

#[test]
fn submit_logic_runs_on_the_logic_thread() {
    let mut engine = start(fast_config());
    let (tx, rx) = crossbeam_channel::bounded(1);
    engine
        .submit_logic(move |services| {
            let name = thread::current().name().map(str::to_owned);
            let _ = tx.send((name, services.world.player_count()));
        })
        .unwrap();
    let (name, players) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(name.as_deref(), Some("tock-logic"));
    assert_eq!(players, 0);
    engine.shutdown();
}
