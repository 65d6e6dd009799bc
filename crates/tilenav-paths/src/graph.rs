//! The chunked navigation graph and its mutation protocol.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, trace, warn};
use rustc_hash::FxHashMap;
use tilenav_core::{CollisionMask, Direction, GridId, Point, Range, TileData, TileRef, TileSource};

use crate::chunk::{Chunk, ChunkKey};
use crate::config::NavConfig;
use crate::events::GraphEvent;
use crate::node::{Node, links_between};
use crate::obstruction::{ObstructionId, ObstructionRegistry};
use crate::profile::AccessProfile;

/// Summary counters, see [`NavGraph::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub grids: usize,
    pub chunks: usize,
    pub nodes: usize,
    pub obstructions: usize,
}

/// Owner of every chunk, per grid, and of the obstruction registry.
///
/// Chunks are built lazily from the [`TileSource`] on first reference and
/// stitched to the chunks already present around them. Mutations arrive as
/// [`GraphEvent`]s: obstruction add/remove go through [`apply_sync`] and only
/// need shared access, everything else goes through [`apply`].
///
/// Every applied mutation bumps the modification stamp of the chunks it
/// touched. Those stamps are the only invalidation signal derived data
/// (regions, reachability) looks at.
///
/// [`apply_sync`]: NavGraph::apply_sync
/// [`apply`]: NavGraph::apply
pub struct NavGraph {
    config: NavConfig,
    source: Box<dyn TileSource + Send + Sync>,
    grids: FxHashMap<GridId, FxHashMap<Point, Chunk>>,
    obstructions: Mutex<ObstructionRegistry>,
    stamp: AtomicU64,
    tick: AtomicU64,
    grid_removals: u64,
}

impl std::fmt::Debug for NavGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavGraph")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("stamp", &self.stamp())
            .field("tick", &self.tick())
            .finish_non_exhaustive()
    }
}

impl NavGraph {
    /// An empty graph reading tiles from `source`. No chunk is built yet.
    pub fn new(config: NavConfig, source: impl TileSource + Send + Sync + 'static) -> Self {
        Self {
            config,
            source: Box::new(source),
            grids: FxHashMap::default(),
            obstructions: Mutex::new(ObstructionRegistry::new()),
            stamp: AtomicU64::new(0),
            tick: AtomicU64::new(0),
            grid_removals: 0,
        }
    }

    /// The configuration the graph was created with.
    #[inline]
    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// The key of the chunk owning `tile`, whether built or not.
    #[inline]
    pub fn chunk_key(&self, tile: TileRef) -> ChunkKey {
        ChunkKey::containing(tile, self.config.chunk_size)
    }

    /// The chunk at `key`, if built.
    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.grids.get(&key.grid)?.get(&key.index)
    }

    /// Built chunks of `grid`, in no particular order.
    pub fn chunks(&self, grid: GridId) -> impl Iterator<Item = &Chunk> {
        self.grids.get(&grid).into_iter().flat_map(|m| m.values())
    }

    /// Whether `grid` has at least one built chunk.
    pub fn has_grid(&self, grid: GridId) -> bool {
        self.grids.contains_key(&grid)
    }

    /// The node of `tile`, if its chunk is built.
    pub fn node(&self, tile: TileRef) -> Option<&Node> {
        self.chunk(self.chunk_key(tile))?.node(tile.pos)
    }

    fn node_mut(&mut self, tile: TileRef) -> Option<&mut Node> {
        let key = self.chunk_key(tile);
        self.grids
            .get_mut(&key.grid)?
            .get_mut(&key.index)?
            .node_mut(tile.pos)
    }

    /// Whether an agent with `profile` may stand on `tile` right now.
    pub fn is_traversable(&self, tile: TileRef, profile: &AccessProfile) -> bool {
        self.node(tile).is_some_and(|n| n.traversable_for(profile))
    }

    /// Latest modification stamp handed out.
    #[inline]
    pub fn stamp(&self) -> u64 {
        self.stamp.load(Ordering::Acquire)
    }

    fn next_stamp(&self) -> u64 {
        self.stamp.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Logical tick, advanced once per scheduler tick.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Number of grid removals applied so far.
    #[inline]
    pub fn grid_removals(&self) -> u64 {
        self.grid_removals
    }

    /// Advance the logical tick and return the new value.
    pub fn advance_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Counts of grids, chunks, nodes and obstructions.
    pub fn stats(&self) -> GraphStats {
        let chunks: usize = self.grids.values().map(FxHashMap::len).sum();
        let side = self.config.chunk_size as usize;
        GraphStats {
            grids: self.grids.len(),
            chunks,
            nodes: chunks * side * side,
            obstructions: self.registry().len(),
        }
    }

    /// Obstructions currently registered on `tile`.
    pub fn obstructions_at(&self, tile: TileRef) -> Vec<(ObstructionId, CollisionMask)> {
        self.registry().at(tile).to_vec()
    }

    fn registry(&self) -> MutexGuard<'_, ObstructionRegistry> {
        self.obstructions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // chunk creation

    /// Build the chunk owning `tile` if it does not exist yet, and stitch it
    /// to its neighbors. Returns the chunk's key.
    pub fn ensure_chunk(&mut self, tile: TileRef) -> ChunkKey {
        let key = self.chunk_key(tile);
        if self.chunk(key).is_some() {
            return key;
        }
        let stamp = self.next_stamp();
        let chunk = Chunk::build(key, self.config.chunk_size, &*self.source, stamp);
        {
            let reg = self.registry();
            for node in chunk.nodes() {
                let mask = reg.mask_at(node.tile());
                if !mask.is_empty() {
                    node.store_blocking(mask);
                }
            }
        }
        self.grids.entry(key.grid).or_default().insert(key.index, chunk);
        self.link_chunk(key);
        trace!("built chunk {:?} at stamp {stamp}", key.index);
        key
    }

    /// Preload every chunk intersecting `range` on `grid`. Returns how many
    /// chunks were created.
    pub fn load_range(&mut self, grid: GridId, range: Range) -> usize {
        if range.is_empty() {
            return 0;
        }
        let size = self.config.chunk_size;
        let lo = range.min.div_floor(size);
        let hi = (range.max - Point::new(1, 1)).div_floor(size);
        let mut created = 0;
        for cy in lo.y..=hi.y {
            for cx in lo.x..=hi.x {
                let key = ChunkKey::new(grid, Point::new(cx, cy));
                if self.chunk(key).is_none() {
                    self.ensure_chunk(TileRef::at(grid, key.origin(size)));
                    created += 1;
                }
            }
        }
        debug!("preloaded {created} chunks of {grid} over {range}");
        created
    }

    fn link_chunk(&mut self, key: ChunkKey) {
        let mut pairs = Vec::new();
        for dir in Direction::ALL {
            let other = key.step(dir);
            let Some(grid) = self.grids.get_mut(&key.grid) else {
                return;
            };
            let Some(neighbor) = grid.get_mut(&other.index) else {
                continue;
            };
            neighbor.set_neighbor(dir.opposite(), Some(key));
            let facing = neighbor.border(dir.opposite());
            if let Some(chunk) = grid.get_mut(&key.index) {
                chunk.set_neighbor(dir, Some(other));
                for p in chunk.border(dir) {
                    pairs.extend(
                        facing
                            .iter()
                            .filter(|q| p.chebyshev(**q) <= 1)
                            .map(|q| (p, *q)),
                    );
                }
            }
        }
        // Diagonal steps between two outer tiles that squeeze past one of
        // our corners.
        if let Some(chunk) = self.chunk(key) {
            for (d, k) in chunk.corners() {
                if let Some((a, b)) = d.components() {
                    pairs.push((k.step(a), k.step(b)));
                }
            }
        }
        trace!("stitching {} border pairs of {:?}", pairs.len(), key.index);
        for (p, q) in pairs {
            self.relink(TileRef::at(key.grid, p), TileRef::at(key.grid, q));
        }
        self.debug_check_symmetry(key);
    }

    fn terrain_passable(&self, tile: TileRef) -> bool {
        self.node(tile).is_some_and(Node::is_passable)
    }

    /// Recompute the link between two adjacent tiles on both sides. Missing
    /// nodes are left alone; the link is set on whichever side exists.
    fn relink(&mut self, a: TileRef, b: TileRef) {
        let Some(dir) = a.pos.direction_to(b.pos) else {
            return;
        };
        let corners = dir.components().map(|(x, y)| {
            (
                self.terrain_passable(a.with_pos(a.pos.step(x))),
                self.terrain_passable(a.with_pos(a.pos.step(y))),
            )
        });
        let linked = links_between(self.terrain_passable(a), self.terrain_passable(b), corners);
        if let Some(n) = self.node_mut(a) {
            n.set_link(dir, linked);
        }
        if let Some(n) = self.node_mut(b) {
            n.set_link(dir.opposite(), linked);
        }
    }

    fn debug_check_symmetry(&self, key: ChunkKey) {
        if !cfg!(debug_assertions) {
            return;
        }
        let Some(chunk) = self.chunk(key) else {
            return;
        };
        for n in chunk.nodes() {
            for (d, q) in n.neighbors() {
                let back = self.node(n.tile().with_pos(q));
                debug_assert!(
                    back.is_some_and(|m| m.has_link(d.opposite())),
                    "asymmetric link {} -> {}",
                    n.tile(),
                    q
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // mutations

    /// Apply a synchronous event (obstruction add/remove) with shared
    /// access. Returns `false` without doing anything for other events.
    pub fn apply_sync(&self, event: &GraphEvent) -> bool {
        match *event {
            GraphEvent::ObstructionAdded { id, tile, layer } => {
                let previous = self.registry().insert(id, tile, layer);
                let stamp = self.next_stamp();
                if let Some(prev) = previous.filter(|p| *p != tile) {
                    self.refresh_blocking(prev, stamp);
                }
                self.refresh_blocking(tile, stamp);
            }
            GraphEvent::ObstructionRemoved { id } => {
                let removed = self.registry().remove(id);
                match removed {
                    Some((tile, _)) => {
                        let stamp = self.next_stamp();
                        self.refresh_blocking(tile, stamp);
                    }
                    None => warn!("removing unknown obstruction {id:?}"),
                }
            }
            _ => return false,
        }
        true
    }

    /// Apply any event. Structural events need exclusive access.
    pub fn apply(&mut self, event: GraphEvent) {
        if self.apply_sync(&event) {
            return;
        }
        match event {
            GraphEvent::TileChanged { tile, data } => self.change_tile(tile, data),
            GraphEvent::ObstructionMoved { id, from, to } => {
                let left = self.registry().relocate(id, to);
                match left {
                    Some(prev) => {
                        if prev != from {
                            debug!("obstruction {id:?} moved from {prev}, expected {from}");
                        }
                        let stamp = self.next_stamp();
                        self.refresh_blocking(prev, stamp);
                        self.refresh_blocking(to, stamp);
                    }
                    None => warn!("moving unknown obstruction {id:?}"),
                }
            }
            GraphEvent::GridRemoved { grid } => {
                let dropped = self.grids.remove(&grid).map_or(0, |m| m.len());
                self.registry().remove_grid(grid);
                self.grid_removals += 1;
                if dropped == 0 {
                    warn!("removing {grid} which has no chunks");
                }
                self.next_stamp();
                debug!("removed {grid} ({dropped} chunks)");
            }
            GraphEvent::ObstructionAdded { .. } | GraphEvent::ObstructionRemoved { .. } => {}
        }
    }

    fn refresh_blocking(&self, tile: TileRef, stamp: u64) {
        let mask = self.registry().mask_at(tile);
        let key = self.chunk_key(tile);
        let Some(chunk) = self.chunk(key) else {
            return;
        };
        if let Some(node) = chunk.node(tile.pos) {
            node.store_blocking(mask);
            chunk.touch(stamp);
        }
    }

    fn change_tile(&mut self, tile: TileRef, data: TileData) {
        let Some(node) = self.node_mut(tile) else {
            trace!("tile change at unbuilt {tile} ignored");
            return;
        };
        node.set_data(data);
        let p = tile.pos;
        for d in Direction::ALL {
            self.relink(tile, tile.with_pos(p.step(d)));
        }
        // Diagonals squeezing past the changed tile.
        for d in Direction::CARDINAL {
            let a = p.step(d);
            let b = p.step(Direction::from_index(d.index() + 2));
            self.relink(tile.with_pos(a), tile.with_pos(b));
        }
        let stamp = self.next_stamp();
        for q in Range::around(p, 1) {
            if let Some(chunk) = self.chunk(self.chunk_key(tile.with_pos(q))) {
                chunk.touch(stamp);
            }
        }
        self.debug_check_symmetry(self.chunk_key(tile));
    }
}
