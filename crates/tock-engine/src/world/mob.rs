//! State shared by players and NPCs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tock_core::{EntityId, Location, RegionCoordinates};

use super::update::{Sprites, UpdateBlock, UpdateFlags};
use super::walking::WalkingQueue;
use crate::action_queue::ActionQueue;
use crate::cooldown::Cooldowns;

/// Mutable per-tick state of a mob.
#[derive(Debug)]
pub struct MobState {
    /// Current tile.
    pub location: Location,
    /// Location the client's loaded map is centred on.
    pub last_known_region: Location,
    /// Region this mob is registered in, if any.
    pub region: Option<RegionCoordinates>,
    /// Pending path.
    pub walking: WalkingQueue,
    /// Steps taken this tick.
    pub sprites: Sprites,
    /// Visual changes this tick.
    pub flags: UpdateFlags,
    /// Where to teleport on the next tick.
    pub teleport_target: Option<Location>,
    /// Whether the mob teleported this tick.
    pub teleporting: bool,
    /// Whether the client must load a new map region this tick.
    pub map_region_changing: bool,
}

impl MobState {
    fn new(location: Location, walking_capacity: usize) -> Self {
        Self {
            location,
            last_known_region: location,
            region: None,
            walking: WalkingQueue::new(walking_capacity),
            sprites: Sprites::default(),
            flags: UpdateFlags::default(),
            teleport_target: None,
            teleporting: false,
            map_region_changing: false,
        }
    }

    /// Apply this tick's movement: a pending teleport, otherwise one walk
    /// step and, when running, one more.
    ///
    /// A step that would leave the client's loaded map is held back for a
    /// tick while the map region is changed. Returns whether the mob
    /// walked.
    pub fn process_movement(&mut self) -> bool {
        let before = self.location;
        let mut walk = None;
        let mut run = None;
        let teleporting = match self.teleport_target.take() {
            Some(target) => {
                self.walking.reset(target);
                self.location = target;
                self.teleporting = true;
                self.sprites = Sprites::default();
                true
            }
            None => {
                walk = self.take_step();
                if walk.is_some() && self.walking.is_running() {
                    run = self.take_step();
                }
                self.sprites = Sprites {
                    walk: walk.and_then(|p| p.dir),
                    run: run.and_then(|p| p.dir),
                };
                false
            }
        };

        if self.location.needs_map_region_change(self.last_known_region) {
            self.map_region_changing = true;
            if !teleporting {
                self.sprites = Sprites::default();
                self.location = before;
                for point in [run, walk].into_iter().flatten() {
                    self.walking.push_front(point);
                }
                walk = None;
            }
            self.last_known_region = self.location;
        }
        walk.is_some()
    }

    fn take_step(&mut self) -> Option<super::walking::Waypoint> {
        let point = self.walking.pop_step()?;
        let dir = point.dir?;
        self.location = self.location.step(dir);
        Some(point)
    }

    /// Clear the per-tick flags.
    pub fn reset_tick_flags(&mut self) {
        self.flags.reset();
        self.teleporting = false;
        self.map_region_changing = false;
    }

    /// How this mob looks to an observer.
    pub fn block(&self, entity: EntityId) -> UpdateBlock {
        UpdateBlock {
            entity,
            location: self.location,
            sprites: self.sprites,
            teleported: self.teleporting,
            map_region_changed: false,
            flags: self.flags,
            chat: None,
        }
    }
}

/// A player or NPC.
#[derive(Debug)]
pub struct Mob {
    id: EntityId,
    state: Mutex<MobState>,
    actions: Mutex<ActionQueue>,
    cooldowns: Cooldowns,
}

impl Mob {
    pub(crate) fn new(
        id: EntityId,
        location: Location,
        walking_capacity: usize,
        backlog_capacity: usize,
    ) -> Self {
        Self {
            id,
            state: Mutex::new(MobState::new(location, walking_capacity)),
            actions: Mutex::new(ActionQueue::new(id, backlog_capacity)),
            cooldowns: Cooldowns::default(),
        }
    }

    /// This mob's id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Lock the movement and flag state.
    pub fn state(&self) -> MutexGuard<'_, MobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the action queue.
    pub fn actions(&self) -> MutexGuard<'_, ActionQueue> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Active cooldowns.
    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }

    /// Current location.
    pub fn location(&self) -> Location {
        self.state().location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_core::Direction;

    fn state_at(x: i32, y: i32) -> MobState {
        MobState::new(Location::new(x, y, 0), 50)
    }

    #[test]
    fn one_step_per_tick_when_walking() {
        let mut state = state_at(3200, 3200);
        state.walking.reset(state.location);
        state.walking.add_step(3203, 3200);
        assert!(state.process_movement());
        assert_eq!(state.location, Location::new(3201, 3200, 0));
        assert_eq!(state.sprites.walk, Some(Direction::East));
        assert_eq!(state.sprites.run, None);
    }

    #[test]
    fn two_steps_per_tick_when_running() {
        let mut state = state_at(3200, 3200);
        state.walking.reset(state.location);
        state.walking.set_running(true);
        state.walking.add_step(3200, 3204);
        assert!(state.process_movement());
        assert_eq!(state.location, Location::new(3200, 3202, 0));
        assert_eq!(state.sprites.run, Some(Direction::North));
    }

    #[test]
    fn idle_mob_does_not_move() {
        let mut state = state_at(3200, 3200);
        assert!(!state.process_movement());
        assert_eq!(state.sprites, Sprites::default());
    }

    #[test]
    fn teleport_discards_path_and_is_not_walking() {
        let mut state = state_at(3200, 3200);
        state.walking.reset(state.location);
        state.walking.add_step(3205, 3200);
        state.teleport_target = Some(Location::new(3210, 3210, 0));
        assert!(!state.process_movement());
        assert!(state.teleporting);
        assert_eq!(state.location, Location::new(3210, 3210, 0));
        assert!(state.walking.is_empty());
    }

    #[test]
    fn far_teleport_changes_map_region() {
        let mut state = state_at(3200, 3200);
        state.teleport_target = Some(Location::new(2800, 3400, 0));
        state.process_movement();
        assert!(state.map_region_changing);
        assert_eq!(state.last_known_region, Location::new(2800, 3400, 0));
        state.reset_tick_flags();
        assert!(!state.map_region_changing);
        assert!(!state.teleporting);
    }

    #[test]
    fn step_leaving_loaded_map_waits_a_tick() {
        // Map chunk x of 3231 is 403; one more tile east crosses into 404,
        // four chunks past the loaded origin.
        let mut state = state_at(3231, 3200);
        state.last_known_region = Location::new(3200, 3200, 0);
        state.walking.reset(state.location);
        state.walking.add_step(3232, 3200);
        assert!(!state.process_movement());
        assert_eq!(state.location, Location::new(3231, 3200, 0));
        assert!(state.map_region_changing);
        state.reset_tick_flags();
        assert!(state.process_movement());
        assert_eq!(state.location, Location::new(3232, 3200, 0));
    }
}
