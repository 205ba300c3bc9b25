//! Connected players.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tock_core::{ChatMessage, EntityId, Location};

use super::mob::Mob;
use super::session::Session;
use super::update::PlayerUpdate;

/// Chat waiting to be spoken and the message spoken this tick.
#[derive(Debug, Default)]
pub struct ChatState {
    /// Messages received from the client, oldest first.
    pub queue: VecDeque<ChatMessage>,
    /// Message promoted during this tick, cleared in the reset phase.
    pub current: Option<ChatMessage>,
}

/// A logged-in player.
pub struct Player {
    mob: Mob,
    name: String,
    session: Arc<dyn Session>,
    chat: Mutex<ChatState>,
    update: Mutex<Option<PlayerUpdate>>,
}

impl Player {
    pub(crate) fn new(
        mob: Mob,
        name: impl Into<String>,
        session: Arc<dyn Session>,
    ) -> Self {
        Self {
            mob,
            name: name.into(),
            session,
            chat: Mutex::new(ChatState::default()),
            update: Mutex::new(None),
        }
    }

    /// Common mob state.
    pub fn mob(&self) -> &Mob {
        &self.mob
    }

    /// This player's id.
    pub fn id(&self) -> EntityId {
        self.mob.id()
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current location.
    pub fn location(&self) -> Location {
        self.mob.location()
    }

    /// The player's network session.
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Lock the chat state.
    pub fn chat(&self) -> MutexGuard<'_, ChatState> {
        self.chat.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The last update package sent to this player.
    pub fn last_update(&self) -> Option<PlayerUpdate> {
        self.update
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn update_slot(&self) -> MutexGuard<'_, Option<PlayerUpdate>> {
        self.update.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id())
            .field("name", &self.name)
            .finish()
    }
}
