//! Eight-way compass directions.

use crate::geom::Point;

/// A unit step on the tile grid. North is towards negative Y.
///
/// Variants are ordered clockwise starting at North, so that the opposite
/// direction is always four positions away.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    /// All eight directions, clockwise from North.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// The four cardinal directions.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Index in `0..8`, usable for per-direction arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Single-bit mask for this direction, used by neighbor link sets.
    #[inline]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Direction with index `i`, wrapping modulo 8.
    #[inline]
    pub const fn from_index(i: usize) -> Direction {
        Self::ALL[i % 8]
    }

    /// The direction pointing the other way.
    #[inline]
    pub const fn opposite(self) -> Direction {
        Self::from_index(self.index() + 4)
    }

    /// Whether both components of the offset are non-zero.
    #[inline]
    pub const fn is_diagonal(self) -> bool {
        (self as u8) % 2 == 1
    }

    /// The two cardinal components of a diagonal direction, e.g.
    /// `NorthEast` → `(North, East)`. `None` for cardinal directions.
    #[inline]
    pub const fn components(self) -> Option<(Direction, Direction)> {
        if !self.is_diagonal() {
            return None;
        }
        Some((
            Self::from_index(self.index() + 7),
            Self::from_index(self.index() + 1),
        ))
    }

    /// The unit offset of one step in this direction.
    #[inline]
    pub const fn offset(self) -> Point {
        match self {
            Direction::North => Point::new(0, -1),
            Direction::NorthEast => Point::new(1, -1),
            Direction::East => Point::new(1, 0),
            Direction::SouthEast => Point::new(1, 1),
            Direction::South => Point::new(0, 1),
            Direction::SouthWest => Point::new(-1, 1),
            Direction::West => Point::new(-1, 0),
            Direction::NorthWest => Point::new(-1, -1),
        }
    }

    /// The direction whose unit offset has the sign of `delta` on each
    /// axis, if `delta` is a non-zero vector with components in `-1..=1`.
    pub fn from_offset(delta: Point) -> Option<Direction> {
        Self::ALL.into_iter().find(|d| d.offset() == delta)
    }

    /// Iterate the directions whose bit is set in `mask`.
    pub fn iter_mask(mask: u8) -> impl Iterator<Item = Direction> {
        Self::ALL.into_iter().filter(move |d| mask & d.bit() != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involutive_and_negates_offset() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_eq!(d.opposite().offset(), Point::ZERO - d.offset());
        }
    }

    #[test]
    fn diagonal_components() {
        assert_eq!(
            Direction::NorthEast.components(),
            Some((Direction::North, Direction::East))
        );
        assert_eq!(
            Direction::NorthWest.components(),
            Some((Direction::West, Direction::North))
        );
        assert_eq!(Direction::South.components(), None);
        for d in Direction::ALL.into_iter().filter(|d| d.is_diagonal()) {
            let (a, b) = d.components().unwrap();
            assert_eq!(a.offset() + b.offset(), d.offset());
        }
    }

    #[test]
    fn mask_iteration() {
        let mask = Direction::North.bit() | Direction::SouthWest.bit();
        let dirs: Vec<_> = Direction::iter_mask(mask).collect();
        assert_eq!(dirs, vec![Direction::North, Direction::SouthWest]);
    }
}
