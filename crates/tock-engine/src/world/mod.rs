//! The live entity set and the spatial index over it.
//!
//! [`World`] is shared behind an `Arc` by the logic thread and every task
//! the tick builds. Each entity carries its own locks; the world's tables
//! only hold `Arc`s, so looking an entity up never blocks on its state.
//!
//! Lock order: an entity's state, then the region manager. Nothing holds
//! two entities' locks at once; update builders copy what they need from
//! one entity before touching the next.

pub mod entity_list;
pub mod mob;
pub mod npc;
pub mod player;
pub mod region;
pub mod session;
pub mod update;
pub mod walking;

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tock_core::{EntityId, EntityKind, Location, RegisterError};

use crate::config::EngineConfig;
use entity_list::EntityList;
use mob::Mob;
use npc::{Npc, NpcDefinition};
use player::Player;
use region::RegionManager;
use session::Session;

/// A resolved entity id.
#[derive(Clone, Debug)]
pub enum MobRef {
    /// A player.
    Player(Arc<Player>),
    /// An NPC.
    Npc(Arc<Npc>),
}

impl Deref for MobRef {
    type Target = Mob;

    fn deref(&self) -> &Mob {
        match self {
            Self::Player(p) => p.mob(),
            Self::Npc(n) => n.mob(),
        }
    }
}

/// Every registered player and NPC.
pub struct World {
    players: EntityList<Player>,
    npcs: EntityList<Npc>,
    regions: Mutex<RegionManager>,
    registration: Mutex<()>,
    view_distance: i32,
    walking_capacity: usize,
    backlog_capacity: usize,
}

impl World {
    /// An empty world sized by `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            players: EntityList::new(config.max_players, EntityId::player),
            npcs: EntityList::new(config.max_npcs, EntityId::npc),
            regions: Mutex::new(RegionManager::new()),
            registration: Mutex::new(()),
            view_distance: config.view_distance,
            walking_capacity: config.walking_queue_capacity,
            backlog_capacity: config.action_backlog_capacity,
        }
    }

    fn new_mob(&self, id: EntityId, location: Location) -> Mob {
        Mob::new(id, location, self.walking_capacity, self.backlog_capacity)
    }

    /// Add a player at `location`.
    ///
    /// Names are unique case-insensitively among online players.
    pub fn register_player(
        &self,
        name: &str,
        session: Arc<dyn Session>,
        location: Location,
    ) -> Result<Arc<Player>, RegisterError> {
        let _guard = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.find_player(name).is_some() {
            return Err(RegisterError::AlreadyOnline {
                name: name.to_owned(),
            });
        }
        let player = self
            .players
            .add_with(|id| Player::new(self.new_mob(id, location), name, session))
            .ok_or(RegisterError::WorldFull)?;
        self.place(player.mob());
        tracing::info!(
            player = %player.id(),
            name = player.name(),
            online = self.players.len(),
            "player registered"
        );
        Ok(player)
    }

    /// Spawn an NPC from `definition` at `location`.
    pub fn register_npc(
        &self,
        definition: Arc<NpcDefinition>,
        location: Location,
    ) -> Result<Arc<Npc>, RegisterError> {
        let npc = self
            .npcs
            .add_with(|id| Npc::new(self.new_mob(id, location), definition))
            .ok_or(RegisterError::WorldFull)?;
        self.place(npc.mob());
        Ok(npc)
    }

    fn place(&self, mob: &Mob) {
        let coords = {
            let mut state = mob.state();
            let coords = state.location.region();
            state.region = Some(coords);
            coords
        };
        self.regions().insert(coords, mob.id());
    }

    fn displace(&self, mob: &Mob) {
        let region = mob.state().region.take();
        if let Some(coords) = region {
            self.regions().remove(coords, mob.id());
        }
    }

    /// Remove a player: cancel their actions, leave their region, and
    /// close their session.
    pub fn unregister_player(&self, id: EntityId) -> Option<Arc<Player>> {
        if id.kind() != EntityKind::Player {
            return None;
        }
        let player = self.players.remove(id)?;
        player.mob().actions().cancel_all();
        self.displace(player.mob());
        player.session().close();
        tracing::info!(
            player = %id,
            name = player.name(),
            online = self.players.len(),
            "player unregistered"
        );
        Some(player)
    }

    /// Remove an NPC and cancel its actions.
    pub fn unregister_npc(&self, id: EntityId) -> Option<Arc<Npc>> {
        if id.kind() != EntityKind::Npc {
            return None;
        }
        let npc = self.npcs.remove(id)?;
        npc.mob().actions().cancel_all();
        self.displace(npc.mob());
        Some(npc)
    }

    /// Unregister every player whose session is no longer connected.
    /// Returns how many were removed.
    pub fn sweep_disconnected(&self) -> usize {
        self.players
            .snapshot()
            .into_iter()
            .filter(|p| !p.session().is_connected())
            .filter_map(|p| self.unregister_player(p.id()))
            .count()
    }

    /// Move `mob` to the region matching its location, if it changed.
    pub(crate) fn refresh_region(&self, mob: &Mob) {
        let (from, to) = {
            let mut state = mob.state();
            let to = state.location.region();
            let from = state.region.replace(to);
            (from, to)
        };
        if from != Some(to) {
            self.regions().relocate(mob.id(), from, to);
        }
    }

    /// The player with `id`.
    pub fn player(&self, id: EntityId) -> Option<Arc<Player>> {
        if id.kind() != EntityKind::Player {
            return None;
        }
        self.players.get(id)
    }

    /// The NPC with `id`.
    pub fn npc(&self, id: EntityId) -> Option<Arc<Npc>> {
        if id.kind() != EntityKind::Npc {
            return None;
        }
        self.npcs.get(id)
    }

    /// Resolve any entity id.
    pub fn mob(&self, id: EntityId) -> Option<MobRef> {
        match id.kind() {
            EntityKind::Player => self.players.get(id).map(MobRef::Player),
            EntityKind::Npc => self.npcs.get(id).map(MobRef::Npc),
        }
    }

    /// Online player with `name`, compared case-insensitively.
    pub fn find_player(&self, name: &str) -> Option<Arc<Player>> {
        self.players.find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Snapshot of every player, in slot order.
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.snapshot()
    }

    /// Snapshot of every NPC, in slot order.
    pub fn npcs(&self) -> Vec<Arc<Npc>> {
        self.npcs.snapshot()
    }

    /// Players online.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// NPCs spawned.
    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    /// Lock the region index.
    pub fn regions(&self) -> MutexGuard<'_, RegionManager> {
        self.regions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tiles visible in each direction.
    pub fn view_distance(&self) -> i32 {
        self.view_distance
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("players", &self.players)
            .field("npcs", &self.npcs)
            .finish()
    }
}
