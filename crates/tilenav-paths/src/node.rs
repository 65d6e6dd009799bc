//! One traversable cell of the navigation graph.

use std::sync::atomic::{AtomicU32, Ordering};

use tilenav_core::{CollisionMask, Direction, Point, TileData, TileRef};

use crate::profile::AccessProfile;

/// The graph representation of a single tile.
///
/// Neighbor links are stored as a direction bitmask: the neighbor in
/// direction `d` is the node at `pos.step(d)`, which may live in another
/// chunk. Links are always symmetric.
///
/// The obstruction mask is atomic so that obstruction add/remove can be
/// applied while searches hold shared access to the graph.
#[derive(Debug)]
pub struct Node {
    tile: TileRef,
    data: TileData,
    links: u8,
    blocking: AtomicU32,
}

impl Node {
    pub(crate) fn new(tile: TileRef, data: TileData) -> Self {
        Self {
            tile,
            data,
            links: 0,
            blocking: AtomicU32::new(0),
        }
    }

    /// The tile this node stands for.
    #[inline]
    pub fn tile(&self) -> TileRef {
        self.tile
    }

    #[inline]
    pub fn pos(&self) -> Point {
        self.tile.pos
    }

    /// Terrain content.
    #[inline]
    pub fn data(&self) -> &TileData {
        &self.data
    }

    /// Whether the terrain can be walked on, ignoring obstructions.
    #[inline]
    pub fn is_passable(&self) -> bool {
        self.data.passable
    }

    #[inline]
    pub fn is_door(&self) -> bool {
        self.data.is_door()
    }

    /// Step cost multiplier for entering this node.
    #[inline]
    pub fn cost(&self) -> f32 {
        self.data.cost.max(1) as f32
    }

    /// Union of the layers of every obstruction standing here.
    #[inline]
    pub fn blocking(&self) -> CollisionMask {
        CollisionMask(self.blocking.load(Ordering::Acquire))
    }

    /// Outgoing links as a direction bitmask.
    #[inline]
    pub fn links(&self) -> u8 {
        self.links
    }

    /// Whether the node links to its neighbor in `dir`.
    #[inline]
    pub fn has_link(&self, dir: Direction) -> bool {
        self.links & dir.bit() != 0
    }

    /// Linked neighbors as `(direction, position)` pairs.
    pub fn neighbors(&self) -> impl Iterator<Item = (Direction, Point)> + '_ {
        let pos = self.pos();
        Direction::iter_mask(self.links).map(move |d| (d, pos.step(d)))
    }

    /// Whether an agent with `profile` may stand on this node.
    #[inline]
    pub fn traversable_for(&self, profile: &AccessProfile) -> bool {
        profile.can_enter(&self.data, self.blocking())
    }

    pub(crate) fn set_data(&mut self, data: TileData) {
        self.data = data;
    }

    pub(crate) fn set_link(&mut self, dir: Direction, linked: bool) {
        if linked {
            self.links |= dir.bit();
        } else {
            self.links &= !dir.bit();
        }
    }

    #[cfg(test)]
    pub(crate) fn clear_links(&mut self) {
        self.links = 0;
    }

    pub(crate) fn store_blocking(&self, mask: CollisionMask) {
        self.blocking.store(mask.0, Ordering::Release);
    }
}

/// Whether two adjacent tiles get a neighbor link, given their terrain and
/// (for a diagonal step) the terrain of the two tiles the step squeezes
/// between.
///
/// Both ends must be passable. A diagonal step additionally needs both
/// orthogonal tiles passable, so walls never leak diagonal edges.
pub(crate) fn links_between(from: bool, to: bool, corners: Option<(bool, bool)>) -> bool {
    from && to && corners.is_none_or(|(a, b)| a && b)
}
