//! Chunk-local regions and the region adjacency graph.
//!
//! A region is a maximal set of nodes in one chunk that are connected by
//! cardinal intra-chunk links and share a classification: a door is always
//! a singleton, other nodes group by obstruction mask. Regions are rebuilt
//! wholesale per chunk whenever the chunk's modification stamp moves past
//! the stamp they were built at.

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use tilenav_core::{AccessTags, CollisionMask, Direction, Point, Range, TileRef};

use crate::chunk::ChunkKey;
use crate::graph::NavGraph;
use crate::profile::AccessProfile;

/// Handle to a region. Handles of torn-down regions never resolve again,
/// even after their slot is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    chunk: ChunkKey,
    origin: Point,
    members: Vec<Point>,
    neighbors: FxHashSet<RegionId>,
    door: Option<AccessTags>,
    blocking: CollisionMask,
}

impl Region {
    #[inline]
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// The chunk the region lies in.
    #[inline]
    pub fn chunk(&self) -> ChunkKey {
        self.chunk
    }

    /// The first member in row-major order.
    #[inline]
    pub fn origin(&self) -> TileRef {
        TileRef::at(self.chunk.grid, self.origin)
    }

    /// Member tiles, in scan order.
    pub fn members(&self) -> &[Point] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Regions sharing a cardinal link with this one.
    pub fn neighbors(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn is_door(&self) -> bool {
        self.door.is_some()
    }

    /// Obstruction mask shared by every member.
    pub fn blocking(&self) -> CollisionMask {
        self.blocking
    }

    /// Whether an agent with `profile` may enter this region.
    pub fn traversable_for(&self, profile: &AccessProfile) -> bool {
        self.door.is_none_or(|req| profile.access.satisfies(req))
            && !profile.collision.blocked_by(self.blocking)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    region: Option<Region>,
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    fn insert(&mut self, build: impl FnOnce(RegionId) -> Region) -> RegionId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                RegionId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    region: None,
                });
                RegionId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.slots[id.index as usize].region = Some(build(id));
        id
    }

    fn remove(&mut self, id: RegionId) -> Option<Region> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let region = slot.region.take()?;
        self.free.push(id.index);
        Some(region)
    }

    fn get(&self, id: RegionId) -> Option<&Region> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.region.as_ref()
    }

    fn get_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.region.as_mut()
    }

    fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Regions of one chunk, valid as of `stamp`.
#[derive(Debug)]
struct ChunkRegions {
    stamp: u64,
    bounds: Range,
    regions: Vec<RegionId>,
    lookup: Vec<Option<RegionId>>,
}

impl ChunkRegions {
    fn get(&self, p: Point) -> Option<RegionId> {
        if !self.bounds.contains(p) {
            return None;
        }
        let local = p - self.bounds.min;
        self.lookup[(local.y * self.bounds.width() + local.x) as usize]
    }
}

/// Every region built so far, and which chunk each belongs to.
#[derive(Debug, Default)]
pub struct RegionGraph {
    arena: Arena,
    chunks: FxHashMap<ChunkKey, ChunkRegions>,
    retired: Vec<RegionId>,
    /// Grid removals already swept.
    swept: u64,
}

impl RegionGraph {
    /// An empty region graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The region behind `id`, unless it was torn down.
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.arena.get(id)
    }

    /// Number of live regions.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Regions currently recorded for chunk `key`, possibly stale.
    pub fn regions_in(&self, key: ChunkKey) -> &[RegionId] {
        self.chunks
            .get(&key)
            .map(|c| c.regions.as_slice())
            .unwrap_or(&[])
    }

    /// Region owning `tile`, after bringing its chunk up to date. `None` for
    /// impassable tiles and tiles of unbuilt chunks.
    pub fn region_of(&mut self, graph: &NavGraph, tile: TileRef) -> Option<RegionId> {
        let key = graph.chunk_key(tile);
        self.refresh(graph, key);
        self.chunks.get(&key)?.get(tile.pos)
    }

    /// Region owning `tile` as currently recorded, without refreshing.
    pub(crate) fn recorded_region(&self, graph: &NavGraph, tile: TileRef) -> Option<RegionId> {
        self.chunks.get(&graph.chunk_key(tile))?.get(tile.pos)
    }

    /// Chunk stamp the recorded regions of `key` were built at.
    pub(crate) fn built_at(&self, key: ChunkKey) -> Option<u64> {
        self.chunks.get(&key).map(|c| c.stamp)
    }

    /// Tear down the regions of every recorded chunk that no longer exists.
    /// Only scans after the graph removed a grid. Returns how many chunks
    /// were dropped.
    pub fn sweep_removed(&mut self, graph: &NavGraph) -> usize {
        if self.swept == graph.grid_removals() {
            return 0;
        }
        self.swept = graph.grid_removals();
        let gone: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|k| graph.chunk(**k).is_none())
            .copied()
            .collect();
        for key in &gone {
            self.teardown(*key);
        }
        if !gone.is_empty() {
            trace!("swept regions of {} removed chunks", gone.len());
        }
        gone.len()
    }

    /// Whether the regions of `key` match the chunk's current stamp.
    pub fn is_current(&self, graph: &NavGraph, key: ChunkKey) -> bool {
        match (graph.chunk(key), self.chunks.get(&key)) {
            (Some(chunk), Some(regions)) => regions.stamp >= chunk.last_modified(),
            (None, None) => true,
            _ => false,
        }
    }

    /// Rebuild the regions of `key` if the chunk changed since they were
    /// built, or tear them down if the chunk is gone. Returns whether
    /// anything was done.
    pub fn refresh(&mut self, graph: &NavGraph, key: ChunkKey) -> bool {
        if self.is_current(graph, key) {
            return false;
        }
        self.teardown(key);
        if graph.chunk(key).is_some() {
            self.regenerate(graph, key);
        }
        true
    }

    /// Handles torn down since the last call.
    pub(crate) fn drain_retired(&mut self) -> Vec<RegionId> {
        std::mem::take(&mut self.retired)
    }

    fn teardown(&mut self, key: ChunkKey) {
        let Some(old) = self.chunks.remove(&key) else {
            return;
        };
        for id in old.regions {
            let Some(region) = self.arena.remove(id) else {
                continue;
            };
            for n in region.neighbors {
                if let Some(other) = self.arena.get_mut(n) {
                    other.neighbors.remove(&id);
                }
            }
            self.retired.push(id);
        }
    }

    fn regenerate(&mut self, graph: &NavGraph, key: ChunkKey) {
        let Some(chunk) = graph.chunk(key) else {
            return;
        };
        // Read before scanning so a concurrent obstruction update makes the
        // result stale rather than silently wrong.
        let stamp = chunk.last_modified();
        let bounds = chunk.bounds();
        let local = |p: Point| {
            let l = p - bounds.min;
            (l.y * bounds.width() + l.x) as usize
        };

        let mut label: Vec<Option<usize>> = vec![None; bounds.len()];
        let mut groups: Vec<Vec<Point>> = Vec::new();
        for node in chunk.nodes() {
            if !node.is_passable() {
                continue;
            }
            let p = node.pos();
            let group = if node.is_door() {
                groups.push(Vec::new());
                groups.len() - 1
            } else {
                let class = node.blocking();
                // Already-scanned neighbors: west and north.
                let joinable = |d: Direction| {
                    if !node.has_link(d) {
                        return None;
                    }
                    let q = p.step(d);
                    let other = chunk.node(q)?;
                    if other.is_door() || other.blocking() != class {
                        return None;
                    }
                    label[local(q)]
                };
                match (joinable(Direction::West), joinable(Direction::North)) {
                    (Some(a), Some(b)) if a != b => {
                        let (big, small) = if groups[a].len() >= groups[b].len() {
                            (a, b)
                        } else {
                            (b, a)
                        };
                        let moved = std::mem::take(&mut groups[small]);
                        for m in &moved {
                            label[local(*m)] = Some(big);
                        }
                        groups[big].extend(moved);
                        big
                    }
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => {
                        groups.push(Vec::new());
                        groups.len() - 1
                    }
                }
            };
            groups[group].push(p);
            label[local(p)] = Some(group);
        }

        let mut lookup: Vec<Option<RegionId>> = vec![None; bounds.len()];
        let mut regions = Vec::new();
        for members in groups.into_iter().filter(|g| !g.is_empty()) {
            let origin = members.iter().copied().min().unwrap_or(bounds.min);
            let Some(first) = chunk.node(origin) else {
                continue;
            };
            let (door, blocking) = (first.data().door, first.blocking());
            let cells: Vec<usize> = members.iter().map(|m| local(*m)).collect();
            let id = self.arena.insert(|id| Region {
                id,
                chunk: key,
                origin,
                members,
                neighbors: FxHashSet::default(),
                door,
                blocking,
            });
            for i in cells {
                debug_assert!(lookup[i].is_none(), "node in two regions");
                lookup[i] = Some(id);
            }
            regions.push(id);
        }
        trace!("{} regions in chunk {:?} at stamp {stamp}", regions.len(), key.index);
        self.chunks.insert(
            key,
            ChunkRegions {
                stamp,
                bounds,
                regions: regions.clone(),
                lookup,
            },
        );
        for id in regions {
            self.connect(graph, id);
        }
    }

    /// Add symmetric adjacency edges between `id` and every region a member
    /// touches through a cardinal link.
    fn connect(&mut self, graph: &NavGraph, id: RegionId) {
        let Some(region) = self.arena.get(id) else {
            return;
        };
        let grid = region.chunk.grid;
        let mut found = FxHashSet::default();
        for &p in &region.members {
            let Some(node) = graph.node(TileRef::at(grid, p)) else {
                continue;
            };
            for d in Direction::CARDINAL {
                if !node.has_link(d) {
                    continue;
                }
                if let Some(other) = self.recorded_region(graph, TileRef::at(grid, p.step(d))) {
                    if other != id {
                        found.insert(other);
                    }
                }
            }
        }
        for other in found {
            if let Some(r) = self.arena.get_mut(other) {
                r.neighbors.insert(id);
            }
            if let Some(r) = self.arena.get_mut(id) {
                r.neighbors.insert(other);
            }
        }
    }
}
