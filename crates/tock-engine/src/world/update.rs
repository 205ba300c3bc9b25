//! Update flags and the per-tick update package sent to each player.

use tock_core::{ChatMessage, Direction, EntityId, Location, TickId};

/// Visual changes an entity accumulated during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateFlag {
    /// Public chat.
    Chat,
    /// Appearance changed.
    Appearance,
    /// Animation started.
    Animation,
    /// Graphic played.
    Graphics,
    /// Started facing another entity.
    FaceEntity,
    /// Forced overhead text.
    ForcedChat,
    /// Took a hit.
    Hit,
}

impl UpdateFlag {
    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Set of [`UpdateFlag`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UpdateFlags(u16);

impl UpdateFlags {
    /// Raise a flag.
    pub fn flag(&mut self, flag: UpdateFlag) {
        self.0 |= flag.bit();
    }

    /// Whether a flag is raised.
    pub fn get(self, flag: UpdateFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Whether any flag is raised.
    pub fn is_update_required(self) -> bool {
        self.0 != 0
    }

    /// Lower every flag.
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Walk and run directions taken this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sprites {
    /// First step, if the entity moved.
    pub walk: Option<Direction>,
    /// Second step, if the entity ran.
    pub run: Option<Direction>,
}

/// What one entity looks like to observers after a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateBlock {
    /// The entity described.
    pub entity: EntityId,
    /// Location after movement.
    pub location: Location,
    /// Steps taken.
    pub sprites: Sprites,
    /// Whether the entity teleported.
    pub teleported: bool,
    /// Whether the observer must load a new map region. Only set on a
    /// player's own block.
    pub map_region_changed: bool,
    /// Raised flags.
    pub flags: UpdateFlags,
    /// Chat spoken this tick.
    pub chat: Option<ChatMessage>,
}

/// Everything a player's client receives for one tick.
///
/// The player's own block comes first, then one block for every player
/// and NPC inside the view distance, in region order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerUpdate {
    /// Tick that produced the package.
    pub tick: TickId,
    /// The receiving player's own block.
    pub own: UpdateBlock,
    /// Other visible players.
    pub others: Vec<UpdateBlock>,
    /// Visible NPCs.
    pub npcs: Vec<UpdateBlock>,
}

impl PlayerUpdate {
    /// A package holding only the player's own block.
    pub fn new(tick: TickId, own: UpdateBlock) -> Self {
        Self {
            tick,
            own,
            others: Vec::new(),
            npcs: Vec::new(),
        }
    }

    /// Whether any block in the package is visible.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.own.entity == entity
            || self.others.iter().any(|b| b.entity == entity)
            || self.npcs.iter().any(|b| b.entity == entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_set_and_reset() {
        let mut flags = UpdateFlags::default();
        assert!(!flags.is_update_required());
        flags.flag(UpdateFlag::Chat);
        flags.flag(UpdateFlag::Hit);
        assert!(flags.get(UpdateFlag::Chat));
        assert!(flags.get(UpdateFlag::Hit));
        assert!(!flags.get(UpdateFlag::Animation));
        flags.reset();
        assert!(!flags.is_update_required());
    }
}
