//! Non-player characters.

use std::sync::Arc;

use tock_core::{EntityId, Location};

use super::mob::Mob;

/// Static template an NPC is spawned from, owned by the world data layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpcDefinition {
    /// Template id.
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Size in tiles along one edge.
    pub size: u8,
}

/// A spawned NPC.
#[derive(Debug)]
pub struct Npc {
    mob: Mob,
    definition: Arc<NpcDefinition>,
}

impl Npc {
    pub(crate) fn new(mob: Mob, definition: Arc<NpcDefinition>) -> Self {
        Self { mob, definition }
    }

    /// Common mob state.
    pub fn mob(&self) -> &Mob {
        &self.mob
    }

    /// This NPC's id.
    pub fn id(&self) -> EntityId {
        self.mob.id()
    }

    /// Template this NPC was spawned from.
    pub fn definition(&self) -> &Arc<NpcDefinition> {
        &self.definition
    }

    /// Current location.
    pub fn location(&self) -> Location {
        self.mob.location()
    }
}
