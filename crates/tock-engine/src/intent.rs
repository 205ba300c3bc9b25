//! Decoded client requests, applied on the logic thread.

use tock_core::{ChatMessage, Location};

use crate::action::Action;
use crate::action_queue::EnqueueOutcome;
use crate::logic_thread::EventSubmitter;
use crate::world::player::Player;

/// Chat messages buffered per player before further ones are dropped.
pub const CHAT_QUEUE_LIMIT: usize = 4;

/// Something a player asked for, already decoded by the protocol layer.
#[derive(Debug)]
pub enum Intent {
    /// Follow a path of sparse waypoints, replacing the current one.
    Walk {
        /// Absolute tile waypoints, in order.
        steps: Vec<(i32, i32)>,
        /// Whether to run.
        running: bool,
    },
    /// Say something in public chat on the next tick.
    Chat(ChatMessage),
    /// Start a game action.
    Action(Action),
    /// Move instantly on the next tick.
    Teleport(Location),
}

impl Intent {
    /// Apply to `player`. Movement and chat take effect in the next tick
    /// phase; actions go straight into the player's queue.
    pub fn apply(self, player: &Player, submitter: &EventSubmitter) {
        match self {
            Self::Walk { steps, running } => {
                let mut state = player.mob().state();
                let at = state.location;
                state.walking.reset(at);
                state.walking.set_running(running);
                for (x, y) in steps {
                    state.walking.add_step(x, y);
                }
            }
            Self::Chat(message) => {
                let mut chat = player.chat();
                if chat.queue.len() < CHAT_QUEUE_LIMIT {
                    chat.queue.push_back(message);
                }
            }
            Self::Action(action) => {
                let outcome = player.mob().actions().enqueue(action, submitter);
                if outcome != EnqueueOutcome::Queued {
                    tracing::debug!(player = %player.id(), ?outcome, "action not queued");
                }
            }
            Self::Teleport(target) => {
                player.mob().state().teleport_target = Some(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::EngineConfig;
    use crate::world::session::Session;
    use crate::world::update::PlayerUpdate;
    use crate::world::World;

    struct Quiet;

    impl Session for Quiet {
        fn is_connected(&self) -> bool {
            true
        }
        fn close(&self) {}
        fn send_update(&self, _update: &PlayerUpdate) {}
    }

    fn player() -> (World, Arc<Player>) {
        let world = World::new(&EngineConfig::default());
        let player = world
            .register_player("walker", Arc::new(Quiet), Location::new(3200, 3200, 0))
            .unwrap();
        (world, player)
    }

    #[test]
    fn walk_replaces_path() {
        let (_world, player) = player();
        let (submitter, _rx) = EventSubmitter::channel();
        Intent::Walk {
            steps: vec![(3210, 3200)],
            running: false,
        }
        .apply(&player, &submitter);
        Intent::Walk {
            steps: vec![(3202, 3200)],
            running: true,
        }
        .apply(&player, &submitter);
        let state = player.mob().state();
        assert_eq!(state.walking.pending_steps(), 2);
        assert!(state.walking.is_running());
    }

    #[test]
    fn chat_is_queued_up_to_the_limit() {
        let (_world, player) = player();
        let (submitter, _rx) = EventSubmitter::channel();
        for i in 0..10u8 {
            Intent::Chat(ChatMessage::new(0, 0, vec![i])).apply(&player, &submitter);
        }
        assert_eq!(player.chat().queue.len(), CHAT_QUEUE_LIMIT);
        assert!(player.chat().current.is_none());
    }

    #[test]
    fn teleport_sets_target() {
        let (_world, player) = player();
        let (submitter, _rx) = EventSubmitter::channel();
        let target = Location::new(2964, 3378, 0);
        Intent::Teleport(target).apply(&player, &submitter);
        assert_eq!(player.mob().state().teleport_target, Some(target));
    }
}
