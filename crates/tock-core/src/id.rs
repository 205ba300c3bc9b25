//! Strongly-typed identifiers.

use std::fmt;

/// Which entity table an [`EntityId`] indexes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// A connected player.
    Player,
    /// A non-player character.
    Npc,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Npc => write!(f, "npc"),
        }
    }
}

/// Non-owning handle to an entity: a slot index into the player or NPC
/// table, plus the generation of that slot's occupant.
///
/// Slot 0 is never allocated, so a valid id always has `index >= 1`. The
/// handle carries no reference to the entity itself; holders resolve it
/// through the world at the moment they need the entity. A lookup for a
/// logged-out entity misses, and so does a lookup with an id whose slot
/// has since been reused: each occupant of a slot gets a fresh generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    kind: EntityKind,
    index: u16,
    generation: u32,
}

impl EntityId {
    /// Id of the player in slot `index`, generation 0.
    pub const fn player(index: u16) -> Self {
        Self {
            kind: EntityKind::Player,
            index,
            generation: 0,
        }
    }

    /// Id of the NPC in slot `index`, generation 0.
    pub const fn npc(index: u16) -> Self {
        Self {
            kind: EntityKind::Npc,
            index,
            generation: 0,
        }
    }

    /// The same slot with the given occupant generation.
    pub const fn with_generation(self, generation: u32) -> Self {
        Self { generation, ..self }
    }

    /// Which occupant of the slot this id names.
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// The table this id indexes.
    pub const fn kind(self) -> EntityKind {
        self.kind
    }

    /// The slot index within its table.
    pub const fn index(self) -> u16 {
        self.index
    }

    /// Whether this id refers to a player.
    pub const fn is_player(self) -> bool {
        matches!(self.kind, EntityKind::Player)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "{}#{}", self.kind, self.index)
        } else {
            write!(f, "{}#{}.{}", self.kind, self.index, self.generation)
        }
    }
}

/// Monotonically increasing tick counter.
///
/// Incremented each time the tick orchestrator fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick after this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
