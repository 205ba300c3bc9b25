//! Fixed-capacity slot table for players and NPCs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tock_core::EntityId;

/// Slot table indexed by [`EntityId::index`].
///
/// Slot 0 is never used. New entities take the lowest free slot, so a slot
/// freed by a logout is reused by the next login. Every occupant of a slot
/// gets the next generation, and lookups only hit when the id's generation
/// matches. Lookups are O(1); iteration works on a snapshot so callers
/// never hold the table lock while touching an entity.
pub struct EntityList<E> {
    slots: Mutex<Slots<E>>,
    capacity: usize,
    make_id: fn(u16) -> EntityId,
}

struct Slot<E> {
    generation: u32,
    entity: Option<Arc<E>>,
}

struct Slots<E> {
    entries: Vec<Slot<E>>,
    len: usize,
}

impl<E> Slots<E> {
    fn occupied(&mut self, id: EntityId) -> Option<&mut Slot<E>> {
        self.entries
            .get_mut(usize::from(id.index()))
            .filter(|slot| slot.entity.is_some() && slot.generation == id.generation())
    }
}

impl<E> EntityList<E> {
    /// Table with room for `capacity` entities whose ids are built by
    /// `make_id` (for example [`EntityId::player`]).
    ///
    /// `capacity` is clamped so every index fits in a `u16`.
    pub fn new(capacity: usize, make_id: fn(u16) -> EntityId) -> Self {
        let capacity = capacity.min(usize::from(u16::MAX) - 1);
        Self {
            slots: Mutex::new(Slots {
                entries: (0..=capacity)
                    .map(|_| Slot {
                        generation: 0,
                        entity: None,
                    })
                    .collect(),
                len: 0,
            }),
            capacity,
            make_id,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<E>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert the entity built by `build` into the first free slot.
    ///
    /// `build` receives the id of the slot it will occupy. Returns `None`
    /// without calling `build` when the table is full.
    pub fn add_with(&self, build: impl FnOnce(EntityId) -> E) -> Option<Arc<E>> {
        let mut slots = self.lock();
        let index = slots
            .entries
            .iter()
            .skip(1)
            .position(|slot| slot.entity.is_none())?
            + 1;
        // Generation 0 is left for ids built by hand, which never resolve.
        let generation = slots.entries[index].generation.wrapping_add(1).max(1);
        let id = (self.make_id)(u16::try_from(index).ok()?).with_generation(generation);
        let entity = Arc::new(build(id));
        slots.entries[index] = Slot {
            generation,
            entity: Some(Arc::clone(&entity)),
        };
        slots.len += 1;
        Some(entity)
    }

    /// Remove and return the entity `id` names.
    pub fn remove(&self, id: EntityId) -> Option<Arc<E>> {
        let mut slots = self.lock();
        let removed = slots.occupied(id)?.entity.take();
        if removed.is_some() {
            slots.len -= 1;
        }
        removed
    }

    /// The entity `id` names, unless it has left its slot.
    pub fn get(&self, id: EntityId) -> Option<Arc<E>> {
        self.lock().occupied(id)?.entity.clone()
    }

    /// Every live entity, in slot order.
    pub fn snapshot(&self) -> Vec<Arc<E>> {
        self.lock()
            .entries
            .iter()
            .filter_map(|slot| slot.entity.clone())
            .collect()
    }

    /// First live entity matching `pred`.
    pub fn find(&self, mut pred: impl FnMut(&E) -> bool) -> Option<Arc<E>> {
        self.lock()
            .entries
            .iter()
            .filter_map(|slot| slot.entity.as_ref())
            .find(|e| pred(e))
            .cloned()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.lock().len
    }

    /// Whether no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of live entities.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<E> std::fmt::Debug for EntityList<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityList")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(capacity: usize) -> EntityList<EntityId> {
        EntityList::new(capacity, EntityId::player)
    }

    #[test]
    fn slot_zero_is_never_used() {
        let list = list(3);
        let first = list.add_with(|id| id).unwrap();
        assert_eq!(first.index(), 1);
        assert!(list.get(EntityId::player(0)).is_none());
    }

    #[test]
    fn full_table_rejects_without_building() {
        let list = list(2);
        list.add_with(|id| id).unwrap();
        list.add_with(|id| id).unwrap();
        let mut built = false;
        assert!(list
            .add_with(|id| {
                built = true;
                id
            })
            .is_none());
        assert!(!built);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn freed_slot_is_reused_first() {
        let list = list(4);
        let ids: Vec<EntityId> = (0..3).map(|_| *list.add_with(|id| id).unwrap()).collect();
        assert_eq!(list.remove(ids[1]).map(|e| e.index()), Some(2));
        assert!(list.remove(ids[1]).is_none());
        assert_eq!(list.add_with(|id| id).unwrap().index(), 2);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn stale_id_misses_after_slot_is_reused() {
        let list = list(4);
        let first = *list.add_with(|id| id).unwrap();
        list.remove(first).unwrap();
        let second = *list.add_with(|id| id).unwrap();
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);

        assert!(list.get(first).is_none());
        assert!(list.remove(first).is_none());
        assert_eq!(list.get(second).as_deref(), Some(&second));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn hand_built_ids_never_resolve() {
        let list = list(2);
        let live = *list.add_with(|id| id).unwrap();
        assert_eq!(live.generation(), 1);
        assert!(list.get(EntityId::player(live.index())).is_none());
    }

    #[test]
    fn snapshot_is_in_slot_order() {
        let list = list(5);
        let ids: Vec<EntityId> = (0..4).map(|_| *list.add_with(|id| id).unwrap()).collect();
        list.remove(ids[0]);
        let indices: Vec<u16> = list.snapshot().iter().map(|e| e.index()).collect();
        assert_eq!(indices, vec![2, 3, 4]);
    }

    #[test]
    fn out_of_range_lookup_misses() {
        let list = list(2);
        assert!(list.get(EntityId::player(900)).is_none());
        assert!(list.remove(EntityId::player(900)).is_none());
    }
}
