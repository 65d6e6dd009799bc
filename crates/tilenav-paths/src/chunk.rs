//! Fixed-size square blocks of nodes: the unit of graph storage and
//! modification tracking.

use std::sync::atomic::{AtomicU64, Ordering};

use tilenav_core::{Direction, GridId, Point, Range, TileRef, TileSource};

use crate::node::{Node, links_between};

/// Identity of a chunk: its grid and its chunk-grid index (tile
/// coordinates floor-divided by the chunk size).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkKey {
    pub grid: GridId,
    pub index: Point,
}

impl ChunkKey {
    /// The chunk at chunk coordinates `index` on `grid`.
    pub const fn new(grid: GridId, index: Point) -> Self {
        Self { grid, index }
    }

    /// The chunk owning `tile`.
    #[inline]
    pub fn containing(tile: TileRef, size: i32) -> Self {
        Self {
            grid: tile.grid,
            index: tile.pos.div_floor(size),
        }
    }

    /// Tile coordinates of the chunk's top-left node.
    #[inline]
    pub fn origin(self, size: i32) -> Point {
        self.index * size
    }

    /// Tiles covered by the chunk.
    #[inline]
    pub fn bounds(self, size: i32) -> Range {
        Range::square(self.origin(size), size)
    }

    /// Direction from `self` to an adjacent chunk on the same grid.
    #[inline]
    pub fn direction_to(self, other: ChunkKey) -> Option<Direction> {
        if self.grid != other.grid {
            return None;
        }
        self.index.direction_to(other.index)
    }

    /// The key of the chunk one step away in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        Self {
            grid: self.grid,
            index: self.index.step(dir),
        }
    }
}

/// A `size`×`size` block of nodes with its chunk-level neighbors and its
/// last-modified stamp.
#[derive(Debug)]
pub struct Chunk {
    key: ChunkKey,
    bounds: Range,
    nodes: Vec<Node>,
    neighbors: [Option<ChunkKey>; 8],
    last_modified: AtomicU64,
}

impl Chunk {
    /// Instantiate every node from `source` and wire intra-chunk links.
    pub(crate) fn build(key: ChunkKey, size: i32, source: &dyn TileSource, stamp: u64) -> Self {
        let bounds = key.bounds(size);
        let nodes = bounds
            .iter()
            .map(|p| {
                let tile = TileRef::at(key.grid, p);
                Node::new(tile, source.tile(tile).unwrap_or_default())
            })
            .collect();
        let mut chunk = Self {
            key,
            bounds,
            nodes,
            neighbors: [None; 8],
            last_modified: AtomicU64::new(stamp),
        };
        chunk.wire_internal();
        chunk
    }

    /// Link every pair of adjacent nodes inside the chunk.
    fn wire_internal(&mut self) {
        const HALF: [Direction; 4] = [
            Direction::East,
            Direction::SouthEast,
            Direction::South,
            Direction::SouthWest,
        ];
        for p in self.bounds {
            for d in HALF {
                let q = p.step(d);
                if !self.bounds.contains(q) {
                    continue;
                }
                // Both orthogonal tiles of an inner diagonal are in the chunk.
                let corners = d
                    .components()
                    .map(|(a, b)| (self.passable(p.step(a)), self.passable(p.step(b))));
                let linked = links_between(self.passable(p), self.passable(q), corners);
                if let Some(n) = self.node_mut(p) {
                    n.set_link(d, linked);
                }
                if let Some(n) = self.node_mut(q) {
                    n.set_link(d.opposite(), linked);
                }
            }
        }
    }

    fn passable(&self, p: Point) -> bool {
        self.node(p).is_some_and(Node::is_passable)
    }

    /// This chunk's key.
    #[inline]
    pub fn key(&self) -> ChunkKey {
        self.key
    }

    /// Tiles covered by this chunk.
    #[inline]
    pub fn bounds(&self) -> Range {
        self.bounds
    }

    /// Whether tile `p` belongs to this chunk.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    #[inline]
    fn index(&self, p: Point) -> Option<usize> {
        if !self.bounds.contains(p) {
            return None;
        }
        let local = p - self.bounds.min;
        Some((local.y * self.bounds.width() + local.x) as usize)
    }

    /// The node at tile `p`, if it lies in this chunk.
    #[inline]
    pub fn node(&self, p: Point) -> Option<&Node> {
        self.index(p).map(|i| &self.nodes[i])
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, p: Point) -> Option<&mut Node> {
        self.index(p).map(|i| &mut self.nodes[i])
    }

    /// All nodes in row-major order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Positions of the nodes on the side of the chunk facing `dir`: a full
    /// edge for a cardinal direction, a single corner for a diagonal one.
    pub fn border(&self, dir: Direction) -> Vec<Point> {
        let Range { min, max } = self.bounds;
        let (left, top, right, bottom) = (min.x, min.y, max.x - 1, max.y - 1);
        match dir {
            Direction::North => (left..=right).map(|x| Point::new(x, top)).collect(),
            Direction::South => (left..=right).map(|x| Point::new(x, bottom)).collect(),
            Direction::West => (top..=bottom).map(|y| Point::new(left, y)).collect(),
            Direction::East => (top..=bottom).map(|y| Point::new(right, y)).collect(),
            Direction::NorthEast => vec![Point::new(right, top)],
            Direction::SouthEast => vec![Point::new(right, bottom)],
            Direction::SouthWest => vec![Point::new(left, bottom)],
            Direction::NorthWest => vec![Point::new(left, top)],
        }
    }

    /// The four outermost corner positions.
    pub(crate) fn corners(&self) -> [(Direction, Point); 4] {
        [
            Direction::NorthEast,
            Direction::SouthEast,
            Direction::SouthWest,
            Direction::NorthWest,
        ]
        .map(|d| (d, self.border(d)[0]))
    }

    /// Key of the built chunk adjacent in `dir`, once stitched.
    #[inline]
    pub fn neighbor(&self, dir: Direction) -> Option<ChunkKey> {
        self.neighbors[dir.index()]
    }

    /// Linked neighbor chunks, at most eight.
    pub fn neighbors(&self) -> impl Iterator<Item = (Direction, ChunkKey)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.neighbors[d.index()].map(|k| (d, k)))
    }

    pub(crate) fn set_neighbor(&mut self, dir: Direction, key: Option<ChunkKey>) {
        self.neighbors[dir.index()] = key;
    }

    /// Modification stamp of the last mutation that touched this chunk.
    #[inline]
    pub fn last_modified(&self) -> u64 {
        self.last_modified.load(Ordering::Acquire)
    }

    pub(crate) fn touch(&self, stamp: u64) {
        self.last_modified.fetch_max(stamp, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilenav_core::{TileData, TileMap};

    const G: GridId = GridId(7);

    fn open_map() -> TileMap {
        let mut map = TileMap::new();
        map.fill(G, Range::new(-32, -32, 32, 32), TileData::FLOOR);
        map
    }

    #[test]
    fn key_partitioning() {
        let k = ChunkKey::containing(TileRef::new(G, -1, 17), 16);
        assert_eq!(k.index, Point::new(-1, 1));
        assert_eq!(k.origin(16), Point::new(-16, 16));
        assert!(k.bounds(16).contains(Point::new(-1, 17)));
        assert_eq!(
            k.direction_to(ChunkKey::new(G, Point::new(0, 1))),
            Some(Direction::East)
        );
        assert_eq!(k.direction_to(ChunkKey::new(GridId(8), Point::new(0, 1))), None);
    }

    #[test]
    fn open_chunk_is_fully_wired() {
        let map = open_map();
        let c = Chunk::build(ChunkKey::new(G, Point::ZERO), 4, &map, 1);
        assert_eq!(c.nodes().count(), 16);
        // Interior node: all eight links.
        assert_eq!(c.node(Point::new(1, 1)).unwrap().links(), 0xFF);
        // Corner: only the three inward links exist before stitching.
        let corner = c.node(Point::new(0, 0)).unwrap();
        let dirs: Vec<_> = Direction::iter_mask(corner.links()).collect();
        assert_eq!(
            dirs,
            vec![Direction::East, Direction::SouthEast, Direction::South]
        );
    }

    #[test]
    fn walls_cut_links_and_corners() {
        let mut map = open_map();
        map.set(TileRef::new(G, 1, 0), TileData::WALL);
        let c = Chunk::build(ChunkKey::new(G, Point::ZERO), 4, &map, 1);
        let a = c.node(Point::new(0, 0)).unwrap();
        assert!(!a.has_link(Direction::East));
        // (0,0) -> (1,1) squeezes past the wall at (1,0).
        assert!(!a.has_link(Direction::SouthEast));
        assert!(a.has_link(Direction::South));
        let wall = c.node(Point::new(1, 0)).unwrap();
        assert_eq!(wall.links(), 0);
    }

    #[test]
    fn links_are_symmetric() {
        let mut map = open_map();
        map.set(TileRef::new(G, 2, 1), TileData::WALL);
        map.set(TileRef::new(G, 0, 3), TileData::EMPTY);
        let c = Chunk::build(ChunkKey::new(G, Point::ZERO), 4, &map, 1);
        for n in c.nodes() {
            for (d, q) in n.neighbors() {
                let other = c.node(q).expect("intra-chunk link");
                assert!(other.has_link(d.opposite()), "{} -> {}", n.pos(), q);
            }
        }
    }

    #[test]
    fn borders() {
        let map = open_map();
        let c = Chunk::build(ChunkKey::new(G, Point::new(1, 0)), 4, &map, 1);
        assert_eq!(
            c.border(Direction::West),
            (0..4).map(|y| Point::new(4, y)).collect::<Vec<_>>()
        );
        assert_eq!(c.border(Direction::SouthEast), vec![Point::new(7, 3)]);
        assert_eq!(c.corners()[0], (Direction::NorthEast, Point::new(7, 0)));
    }

    #[test]
    fn touch_only_moves_forward() {
        let map = open_map();
        let c = Chunk::build(ChunkKey::new(G, Point::ZERO), 2, &map, 5);
        c.touch(3);
        assert_eq!(c.last_modified(), 5);
        c.touch(9);
        assert_eq!(c.last_modified(), 9);
    }
}
