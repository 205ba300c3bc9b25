//! Monotonic time source used by the event manager.
//!
//! All scheduling arithmetic is done in whole milliseconds relative to the
//! clock's own origin. [`MonotonicClock`] is the production source; tests
//! substitute a manually advanced clock so drift arithmetic can be checked
//! without sleeping.

use std::fmt;
use std::time::{Duration, Instant};

/// A point on a [`Clock`]'s timeline, in milliseconds since its origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Millis(pub u64);

impl Millis {
    /// The instant `delay_ms` milliseconds after `self`.
    pub const fn after(self, delay_ms: u64) -> Self {
        Self(self.0.saturating_add(delay_ms))
    }

    /// Milliseconds elapsed from `earlier` to `self`, zero if `earlier` is
    /// in the future.
    pub const fn since(self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// The span from `self` until `later`, zero if `later` has passed.
    pub fn until(self, later: Millis) -> Duration {
        Duration::from_millis(later.0.saturating_sub(self.0))
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// Current time on this clock's timeline.
    fn now(&self) -> Millis;
}

/// [`Clock`] backed by [`Instant`], with its origin at construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Millis {
        Millis(u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX))
    }
}
