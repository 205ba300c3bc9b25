//! Tile geometry: absolute locations, step directions, and the coarse
//! region grid used for visibility lookups.

use std::fmt;

use smallvec::SmallVec;

/// Side length, in tiles, of one [`RegionCoordinates`] cell.
pub const REGION_SIZE: i32 = 32;

/// An absolute tile position on a height plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// Absolute x coordinate.
    pub x: i32,
    /// Absolute y coordinate.
    pub y: i32,
    /// Height plane.
    pub z: i32,
}

impl Location {
    /// Create a location.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The 8×8 map chunk x the client uses as its map-region origin.
    pub const fn map_region_x(self) -> i32 {
        (self.x >> 3) - 6
    }

    /// The 8×8 map chunk y the client uses as its map-region origin.
    pub const fn map_region_y(self) -> i32 {
        (self.y >> 3) - 6
    }

    /// x relative to the map region of `origin`.
    pub const fn local_x(self, origin: Location) -> i32 {
        self.x.saturating_sub(origin.map_region_x().saturating_mul(8))
    }

    /// y relative to the map region of `origin`.
    pub const fn local_y(self, origin: Location) -> i32 {
        self.y.saturating_sub(origin.map_region_y().saturating_mul(8))
    }

    /// Whether the client's loaded map around `last_region` no longer
    /// covers `self` and a new map region must be sent.
    pub const fn needs_map_region_change(self, last_region: Location) -> bool {
        let dx = self.map_region_x() - last_region.map_region_x();
        let dy = self.map_region_y() - last_region.map_region_y();
        dx <= -4 || dy <= -4 || dx >= 4 || dy >= 4
    }

    /// Whether `other` is on the same plane and inside the square view
    /// window of `distance` tiles around `self`.
    ///
    /// The window is `[-distance, distance - 1]` on each axis, matching
    /// the client's view of 15 tiles behind and 14 ahead.
    pub const fn is_within_distance(self, other: Location, distance: i32) -> bool {
        if self.z != other.z {
            return false;
        }
        let dx = other.x.saturating_sub(self.x);
        let dy = other.y.saturating_sub(self.y);
        dx < distance && dx >= -distance && dy < distance && dy >= -distance
    }

    /// This location shifted by a delta, stopping at the edge of the
    /// coordinate range.
    pub const fn transform(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// This location moved one tile in `direction`.
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.transform(dx, dy, 0)
    }

    /// The region cell containing this location.
    pub const fn region(self) -> RegionCoordinates {
        RegionCoordinates::new(self.x.div_euclid(REGION_SIZE), self.y.div_euclid(REGION_SIZE))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

/// One of the eight single-tile step directions.
///
/// The discriminant is the direction code the client expects in movement
/// updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// -x, +y.
    NorthWest = 0,
    /// +y.
    North = 1,
    /// +x, +y.
    NorthEast = 2,
    /// -x.
    West = 3,
    /// +x.
    East = 4,
    /// -x, -y.
    SouthWest = 5,
    /// -y.
    South = 6,
    /// +x, -y.
    SouthEast = 7,
}

impl Direction {
    /// Direction of a step with the given per-axis deltas. Only the sign of
    /// each delta matters; `(0, 0)` has no direction.
    pub const fn between(dx: i32, dy: i32) -> Option<Self> {
        Some(match (dx.signum(), dy.signum()) {
            (-1, 1) => Self::NorthWest,
            (0, 1) => Self::North,
            (1, 1) => Self::NorthEast,
            (-1, 0) => Self::West,
            (1, 0) => Self::East,
            (-1, -1) => Self::SouthWest,
            (0, -1) => Self::South,
            (1, -1) => Self::SouthEast,
            _ => return None,
        })
    }

    /// Unit delta for one step in this direction.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::NorthWest => (-1, 1),
            Self::North => (0, 1),
            Self::NorthEast => (1, 1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
            Self::SouthWest => (-1, -1),
            Self::South => (0, -1),
            Self::SouthEast => (1, -1),
        }
    }

    /// Client direction code.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Coordinates of a [`REGION_SIZE`]-tile square region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoordinates {
    /// Region x.
    pub x: i32,
    /// Region y.
    pub y: i32,
}

impl RegionCoordinates {
    /// Create region coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// This region followed by its eight neighbours.
    pub fn surrounding(self) -> SmallVec<[RegionCoordinates; 9]> {
        let mut out = SmallVec::new();
        out.push(self);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx != 0 || dy != 0 {
                    out.push(Self::new(self.x + dx, self.y + dy));
                }
            }
        }
        out
    }
}

impl fmt::Display for RegionCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn direction_codes_match_client_table() {
        assert_eq!(Direction::between(-1, 1).map(Direction::code), Some(0));
        assert_eq!(Direction::between(0, 1).map(Direction::code), Some(1));
        assert_eq!(Direction::between(1, 1).map(Direction::code), Some(2));
        assert_eq!(Direction::between(-1, 0).map(Direction::code), Some(3));
        assert_eq!(Direction::between(1, 0).map(Direction::code), Some(4));
        assert_eq!(Direction::between(-1, -1).map(Direction::code), Some(5));
        assert_eq!(Direction::between(0, -1).map(Direction::code), Some(6));
        assert_eq!(Direction::between(1, -1).map(Direction::code), Some(7));
        assert_eq!(Direction::between(0, 0), None);
    }

    #[test]
    fn view_window_is_fifteen_behind_fourteen_ahead() {
        let origin = Location::new(3200, 3200, 0);
        assert!(origin.is_within_distance(origin.transform(14, 0, 0), 15));
        assert!(!origin.is_within_distance(origin.transform(15, 0, 0), 15));
        assert!(origin.is_within_distance(origin.transform(-15, 0, 0), 15));
        assert!(!origin.is_within_distance(origin.transform(-16, 0, 0), 15));
        assert!(!origin.is_within_distance(origin.transform(0, 0, 1), 15));
    }

    #[test]
    fn extreme_coordinates_saturate() {
        let low = Location::new(i32::MIN, i32::MIN, 0);
        let high = Location::new(i32::MAX, i32::MAX, 0);
        assert_eq!(low.step(Direction::SouthWest), low);
        assert_eq!(high.step(Direction::NorthEast), high);
        assert!(!low.is_within_distance(high, 15));
        assert!(!high.is_within_distance(low, 15));
        assert_eq!(low.local_x(high), i32::MIN);
        assert_eq!(high.local_x(low), i32::MAX);
    }

    #[test]
    fn map_region_change_after_four_chunks() {
        let last = Location::new(3222, 3222, 0);
        assert!(!last.transform(24, 0, 0).needs_map_region_change(last));
        assert!(last.transform(40, 0, 0).needs_map_region_change(last));
    }

    #[test]
    fn surrounding_starts_with_centre_and_has_nine_cells() {
        let centre = RegionCoordinates::new(100, 100);
        let cells = centre.surrounding();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], centre);
        assert!(cells.contains(&RegionCoordinates::new(99, 101)));
    }

    #[test]
    fn negative_coordinates_floor_into_regions() {
        assert_eq!(Location::new(-1, -1, 0).region(), RegionCoordinates::new(-1, -1));
        assert_eq!(Location::new(31, 32, 0).region(), RegionCoordinates::new(0, 1));
    }

    proptest! {
        #[test]
        fn step_then_between_round_trips(dx in -1i32..=1, dy in -1i32..=1) {
            if let Some(dir) = Direction::between(dx, dy) {
                let start = Location::new(3200, 3200, 0);
                let next = start.step(dir);
                prop_assert_eq!(next.x - start.x, dx);
                prop_assert_eq!(next.y - start.y, dy);
            } else {
                prop_assert_eq!((dx, dy), (0, 0));
            }
        }
    }
}
