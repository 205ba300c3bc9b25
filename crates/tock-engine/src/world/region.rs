//! Region membership used to find nearby entities.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tock_core::{EntityId, RegionCoordinates};

/// Entities currently inside one region.
#[derive(Clone, Debug, Default)]
pub struct Region {
    players: IndexSet<EntityId>,
    npcs: IndexSet<EntityId>,
}

impl Region {
    /// Players in this region, in arrival order.
    pub fn players(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.players.iter().copied()
    }

    /// NPCs in this region, in arrival order.
    pub fn npcs(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.npcs.iter().copied()
    }

    fn set_for(&mut self, id: EntityId) -> &mut IndexSet<EntityId> {
        if id.is_player() {
            &mut self.players
        } else {
            &mut self.npcs
        }
    }

    fn is_empty(&self) -> bool {
        self.players.is_empty() && self.npcs.is_empty()
    }
}

/// Ids of the entities in a 3×3 block of regions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Neighbourhood {
    /// Players, centre region first.
    pub players: Vec<EntityId>,
    /// NPCs, centre region first.
    pub npcs: Vec<EntityId>,
}

/// Every non-empty region, keyed by coordinates.
///
/// Only mutated from the tick phase and from registration on the logic
/// thread; update leaves take read-only copies through
/// [`neighbourhood`](Self::neighbourhood).
#[derive(Debug, Default)]
pub struct RegionManager {
    regions: IndexMap<RegionCoordinates, Region>,
}

impl RegionManager {
    /// No regions.
    pub fn new() -> Self {
        Self::default()
    }

    /// The region at `coords`, if anything is in it.
    pub fn region(&self, coords: RegionCoordinates) -> Option<&Region> {
        self.regions.get(&coords)
    }

    /// Number of non-empty regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether every region is empty.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Add `id` to the region at `coords`.
    pub fn insert(&mut self, coords: RegionCoordinates, id: EntityId) {
        self.regions.entry(coords).or_default().set_for(id).insert(id);
    }

    /// Remove `id` from the region at `coords`. Empty regions are dropped.
    pub fn remove(&mut self, coords: RegionCoordinates, id: EntityId) -> bool {
        let Some(region) = self.regions.get_mut(&coords) else {
            return false;
        };
        let removed = region.set_for(id).shift_remove(&id);
        if region.is_empty() {
            self.regions.shift_remove(&coords);
        }
        removed
    }

    /// Move `id` between regions. A `from` of `None` means it was not in
    /// any region yet.
    pub fn relocate(&mut self, id: EntityId, from: Option<RegionCoordinates>, to: RegionCoordinates) {
        if from == Some(to) {
            return;
        }
        if let Some(from) = from {
            self.remove(from, id);
        }
        self.insert(to, id);
    }

    /// Entities in `centre` and its eight neighbours.
    pub fn neighbourhood(&self, centre: RegionCoordinates) -> Neighbourhood {
        let coords: SmallVec<[RegionCoordinates; 9]> = centre.surrounding();
        let mut out = Neighbourhood::default();
        for region in coords.iter().filter_map(|c| self.regions.get(c)) {
            out.players.extend(region.players());
            out.npcs.extend(region.npcs());
        }
        out
    }
}
