//! Walking queue: a bounded path of single-tile steps.

use std::collections::VecDeque;

use tock_core::{Direction, Location};

/// One tile of a path. The anchor at the head of a fresh path has no
/// direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Waypoint {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) dir: Option<Direction>,
}

/// Path an entity will follow, one step per tick (two when running).
///
/// Clients send sparse waypoints; [`add_step`](Self::add_step) fills in
/// every tile between the last queued point and the new one. Points beyond
/// the capacity are dropped.
#[derive(Clone, Debug)]
pub struct WalkingQueue {
    points: VecDeque<Waypoint>,
    capacity: usize,
    running: bool,
}

impl WalkingQueue {
    /// Empty queue holding at most `capacity` points.
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            running: false,
        }
    }

    /// Discard the path and anchor a new one at `at`.
    pub fn reset(&mut self, at: Location) {
        self.points.clear();
        self.points.push_back(Waypoint {
            x: at.x,
            y: at.y,
            dir: None,
        });
    }

    /// Discard the path entirely.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Whether the second step of each tick is taken too.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Toggle running.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Queue every tile from the last point to `(x, y)`, until the queue
    /// is full.
    ///
    /// On an empty queue the point becomes the anchor. Waypoints are
    /// client input, so any pair of coordinates is accepted.
    pub fn add_step(&mut self, x: i32, y: i32) {
        let Some(last) = self.points.back().copied() else {
            self.points.push_back(Waypoint { x, y, dir: None });
            return;
        };
        let (x, y) = (i64::from(x), i64::from(y));
        let mut dx = x - i64::from(last.x);
        let mut dy = y - i64::from(last.y);
        while dx != 0 || dy != 0 {
            dx -= dx.signum();
            dy -= dy.signum();
            // Each tile lies between the last point and the target.
            let (Ok(tx), Ok(ty)) = (i32::try_from(x - dx), i32::try_from(y - dy)) else {
                return;
            };
            if !self.push_tile(tx, ty) {
                return;
            }
        }
    }

    /// Append one tile adjacent to the last point. Returns false when the
    /// queue is full.
    fn push_tile(&mut self, x: i32, y: i32) -> bool {
        if self.points.len() >= self.capacity {
            return false;
        }
        let Some(last) = self.points.back() else {
            return false;
        };
        let dir = Direction::between(x.saturating_sub(last.x), y.saturating_sub(last.y));
        self.points.push_back(Waypoint { x, y, dir });
        true
    }

    /// Take the next step, skipping anchors.
    pub(crate) fn pop_step(&mut self) -> Option<Waypoint> {
        while let Some(point) = self.points.pop_front() {
            if point.dir.is_some() {
                return Some(point);
            }
        }
        None
    }

    /// Put a step back at the head of the path.
    pub(crate) fn push_front(&mut self, point: Waypoint) {
        self.points.push_front(point);
    }

    /// Steps still to take.
    pub fn pending_steps(&self) -> usize {
        self.points.iter().filter(|p| p.dir.is_some()).count()
    }

    /// Whether no step is queued.
    pub fn is_empty(&self) -> bool {
        self.pending_steps() == 0
    }
}
