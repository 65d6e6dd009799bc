//! Tile identity and terrain content.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::geom::Point;

/// Identifier of one independent tile grid (a map, a ship, a station...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridId(pub u32);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid#{}", self.0)
    }
}

/// Identity of a single tile: a grid and integer coordinates on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileRef {
    pub grid: GridId,
    pub pos: Point,
}

impl TileRef {
    /// The tile at `(x, y)` on `grid`.
    #[inline]
    pub const fn new(grid: GridId, x: i32, y: i32) -> Self {
        Self {
            grid,
            pos: Point::new(x, y),
        }
    }

    /// The tile at `pos` on `grid`.
    #[inline]
    pub const fn at(grid: GridId, pos: Point) -> Self {
        Self { grid, pos }
    }

    /// The tile at `pos` on the same grid.
    #[inline]
    pub const fn with_pos(self, pos: Point) -> Self {
        Self {
            grid: self.grid,
            pos,
        }
    }
}

impl fmt::Display for TileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.grid, self.pos)
    }
}

// ---------------------------------------------------------------------------
// Bitsets
// ---------------------------------------------------------------------------

/// A set of access tags (up to 64), as carried by agents and required by
/// doors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessTags(pub u64);

impl AccessTags {
    pub const NONE: Self = Self(0);

    /// A set holding the single tag `tag` (taken modulo 64).
    #[inline]
    pub const fn tag(tag: u8) -> Self {
        Self(1u64 << (tag % 64))
    }

    /// These tags plus `tag`.
    #[inline]
    pub const fn with(self, tag: u8) -> Self {
        Self(self.0 | Self::tag(tag).0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether any tag is shared with `other`.
    #[inline]
    pub const fn intersects(self, other: AccessTags) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether a holder of `self` passes a door requiring `required`.
    /// A door with no requirement is open to everyone.
    #[inline]
    pub const fn satisfies(self, required: AccessTags) -> bool {
        required.is_empty() || self.intersects(required)
    }
}

impl BitOr for AccessTags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Obstruction layers: which collision layers an obstruction occupies, or
/// which layers an agent collides with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// A mask with only `layer` set.
    #[inline]
    pub const fn layer(layer: u8) -> Self {
        Self(1u32 << (layer % 32))
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether an agent colliding with `self` is stopped by `blocking`.
    #[inline]
    pub const fn blocked_by(self, blocking: CollisionMask) -> bool {
        self.0 & blocking.0 != 0
    }
}

impl BitOr for CollisionMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollisionMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CollisionMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// TileData
// ---------------------------------------------------------------------------

/// Terrain content of a tile, as far as navigation cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileData {
    /// Whether the terrain itself can be walked on.
    pub passable: bool,
    /// Step cost multiplier for entering this tile. Never below 1.
    pub cost: u8,
    /// If set, the tile is a door requiring one of these access tags.
    pub door: Option<AccessTags>,
}

impl TileData {
    /// Empty space or a missing tile. Never traversable.
    pub const EMPTY: Self = Self {
        passable: false,
        cost: 1,
        door: None,
    };

    /// Plain floor with unit cost.
    pub const FLOOR: Self = Self {
        passable: true,
        cost: 1,
        door: None,
    };

    /// Solid terrain.
    pub const WALL: Self = Self {
        passable: false,
        cost: 1,
        door: None,
    };

    /// Floor that costs `cost` (clamped to at least 1) to enter.
    #[inline]
    pub const fn floor_with_cost(cost: u8) -> Self {
        Self {
            passable: true,
            cost: if cost == 0 { 1 } else { cost },
            door: None,
        }
    }

    /// A passable door requiring one of `required` to walk through.
    #[inline]
    pub const fn door(required: AccessTags) -> Self {
        Self {
            passable: true,
            cost: 1,
            door: Some(required),
        }
    }

    /// Whether entering the tile needs access tags.
    #[inline]
    pub const fn is_door(&self) -> bool {
        self.door.is_some()
    }
}

impl Default for TileData {
    fn default() -> Self {
        Self::EMPTY
    }
}
