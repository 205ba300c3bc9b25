//! Timed per-entity cooldown flags.

use std::sync::atomic::{AtomicU32, Ordering};

use tock_core::EntityId;

use crate::engine::SubmitError;
use crate::event::{Event, EventContext, EventError, RecurringEvent};
use crate::logic_thread::EventSubmitter;

/// Something an entity must wait for before doing again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cooldown {
    /// Melee attack.
    MeleeSwing,
    /// Ranged attack.
    RangedShot,
    /// Spell.
    SpellCast,
    /// Special attack.
    SpecialAttack,
}

impl Cooldown {
    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Bitset of active cooldowns. Readable from any thread.
#[derive(Debug, Default)]
pub struct Cooldowns {
    bits: AtomicU32,
}

impl Cooldowns {
    /// Whether `cooldown` is active.
    pub fn get(&self, cooldown: Cooldown) -> bool {
        self.bits.load(Ordering::Acquire) & cooldown.bit() != 0
    }

    /// Set or clear `cooldown`.
    pub fn set(&self, cooldown: Cooldown, active: bool) {
        if active {
            self.bits.fetch_or(cooldown.bit(), Ordering::AcqRel);
        } else {
            self.bits.fetch_and(!cooldown.bit(), Ordering::AcqRel);
        }
    }

    /// Whether any cooldown is active.
    pub fn any_pending(&self) -> bool {
        self.bits.load(Ordering::Acquire) != 0
    }

    /// Clear every cooldown.
    pub fn reset(&self) {
        self.bits.store(0, Ordering::Release);
    }

    /// Activate `cooldown` on `entity` and schedule it to clear after
    /// `duration_ms`.
    pub fn flag(
        &self,
        entity: EntityId,
        cooldown: Cooldown,
        duration_ms: u64,
        submitter: &EventSubmitter,
    ) -> Result<(), SubmitError> {
        self.set(cooldown, true);
        submitter.submit(RecurringEvent::new(
            duration_ms,
            CooldownEvent { entity, cooldown },
        ))
    }
}

/// One-shot event clearing a cooldown, then stopping itself.
#[derive(Debug)]
pub struct CooldownEvent {
    entity: EntityId,
    cooldown: Cooldown,
}

impl Event for CooldownEvent {
    fn execute(&mut self, ctx: &EventContext<'_>) -> Result<(), EventError> {
        if let Some(mob) = ctx.world().mob(self.entity) {
            mob.cooldowns().set(self.cooldown, false);
        }
        ctx.stop();
        Ok(())
    }

    fn name(&self) -> &str {
        "cooldown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_independent() {
        let cooldowns = Cooldowns::default();
        cooldowns.set(Cooldown::MeleeSwing, true);
        cooldowns.set(Cooldown::SpellCast, true);
        assert!(cooldowns.get(Cooldown::MeleeSwing));
        assert!(!cooldowns.get(Cooldown::RangedShot));
        cooldowns.set(Cooldown::MeleeSwing, false);
        assert!(!cooldowns.get(Cooldown::MeleeSwing));
        assert!(cooldowns.get(Cooldown::SpellCast));
        cooldowns.reset();
        assert!(!cooldowns.any_pending());
    }

    #[test]
    fn flag_sets_bit_and_submits_event() {
        let (submitter, rx) = EventSubmitter::channel();
        let cooldowns = Cooldowns::default();
        cooldowns
            .flag(EntityId::player(1), Cooldown::SpecialAttack, 3000, &submitter)
            .unwrap();
        assert!(cooldowns.get(Cooldown::SpecialAttack));
        match rx.try_recv() {
            Ok(crate::logic_thread::LogicMessage::Submit(event)) => {
                assert_eq!(event.handle().delay(), 3000);
                assert_eq!(event.name(), "cooldown");
            }
            _ => panic!("expected a submitted cooldown event"),
        }
    }
}
