//! Coarse reachability over the region graph.

use std::collections::VecDeque;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use tilenav_core::{Direction, TileRef};

use crate::astar::nearest_open_tile;
use crate::chunk::ChunkKey;
use crate::graph::NavGraph;
use crate::profile::{AccessProfile, Agent};
use crate::region::{Region, RegionGraph, RegionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    profile: AccessProfile,
    source: RegionId,
}

#[derive(Debug)]
struct CacheEntry {
    stamp: u64,
    tick: u64,
    reachable: FxHashSet<RegionId>,
    /// Chunks the result depends on, and whether each existed when it was
    /// computed.
    chunks: FxHashMap<ChunkKey, bool>,
}

/// Answers "can this agent ever get there" from cached region floods.
///
/// Entries are keyed by `(profile, source region)`. An entry is trusted
/// without checks for `min_cache_lifetime` ticks; after that it is
/// validated against the modification stamps of every chunk it depends on
/// and recomputed if any moved.
#[derive(Debug, Default)]
pub struct RegionCache {
    regions: RegionGraph,
    entries: FxHashMap<CacheKey, CacheEntry>,
    profiles: FxHashSet<AccessProfile>,
}

/// How far a profile's flood reaches; `0` means unbounded.
fn horizon(profile: &AccessProfile) -> Option<i32> {
    match profile.vision_radius {
        0 => None,
        r => Some(r.saturating_mul(2).min(i32::MAX as u32) as i32),
    }
}

/// Orders profiles by how much a flood can see.
fn reach_rank(profile: &AccessProfile) -> u64 {
    match profile.vision_radius {
        0 => u64::MAX,
        r => u64::from(r),
    }
}

impl RegionCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Region owning `tile`, rebuilding its chunk's regions if stale.
    pub fn region_of(&mut self, graph: &NavGraph, tile: TileRef) -> Option<RegionId> {
        self.regions.region_of(graph, tile)
    }

    /// Shorthand for `self.regions().region(id)`.
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.region(id)
    }

    /// The underlying region graph.
    pub fn regions(&self) -> &RegionGraph {
        &self.regions
    }

    /// Number of cached reachability sets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached reachability set. Regions are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.profiles.clear();
    }

    /// Whether `agent` can reach `target`, or, when `target` cannot be
    /// entered, some tile within Euclidean distance `range` of it.
    ///
    /// Agents on different grids never reach each other; an agent always
    /// reaches its own tile.
    pub fn can_access(&mut self, graph: &NavGraph, agent: &Agent, target: TileRef, range: u32) -> bool {
        if self.regions.sweep_removed(graph) > 0 {
            self.prune();
        }
        let profile = agent.profile;
        if agent.tile.grid != target.grid {
            return false;
        }
        if agent.tile == target {
            return true;
        }
        let dest = if graph.is_traversable(target, &profile) {
            target
        } else if range > 0 {
            match nearest_open_tile(graph, target, range, &profile) {
                Some(t) => t,
                None => return false,
            }
        } else {
            return false;
        };
        if dest == agent.tile {
            return true;
        }

        let stamp = graph.stamp();
        let (Some(src), Some(dst)) = (
            self.regions.region_of(graph, agent.tile),
            self.regions.region_of(graph, dest),
        ) else {
            return false;
        };
        self.prune();
        if src == dst {
            return true;
        }

        let key = CacheKey { profile, source: src };
        if let Some(entry) = self.entries.get(&key) {
            if self.is_fresh(graph, entry, dst) {
                return entry.reachable.contains(&dst);
            }
        }
        // A flood with a shorter horizon reaches a subset of ours, so its
        // positive answers carry over.
        let rank = reach_rank(&profile);
        let borrowed = self.profiles.iter().any(|other| {
            other != &profile
                && other.same_capabilities(&profile)
                && reach_rank(other) <= rank
                && self
                    .entries
                    .get(&CacheKey {
                        profile: *other,
                        source: src,
                    })
                    .is_some_and(|e| self.is_fresh(graph, e, dst) && e.reachable.contains(&dst))
        });
        if borrowed {
            return true;
        }

        let entry = self.flood(graph, src, dst, &profile, stamp);
        let hit = entry.reachable.contains(&dst);
        debug!(
            "reachability from {:?} recomputed: {} regions over {} chunks",
            src,
            entry.reachable.len(),
            entry.chunks.len()
        );
        self.entries.insert(key, entry);
        self.profiles.insert(profile);
        hit
    }

    /// Whether `entry` can answer for destination region `dst`.
    fn is_fresh(&self, graph: &NavGraph, entry: &CacheEntry, dst: RegionId) -> bool {
        // Handles minted after the entry cannot be in it, so a rebuilt
        // destination chunk always goes through full validation.
        let rebuilt = self
            .regions
            .region(dst)
            .and_then(|r| self.regions.built_at(r.chunk()))
            .is_some_and(|built| built > entry.stamp);
        let age = graph.tick().saturating_sub(entry.tick);
        if age < graph.config().min_cache_lifetime && !rebuilt {
            return true;
        }
        entry.chunks.iter().all(|(key, existed)| match graph.chunk(*key) {
            Some(chunk) => chunk.last_modified() <= entry.stamp,
            None => !existed,
        })
    }

    /// Forget entries whose source region was torn down.
    fn prune(&mut self) {
        let retired: FxHashSet<RegionId> = self.regions.drain_retired().into_iter().collect();
        if retired.is_empty() {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|k, _| !retired.contains(&k.source));
        if self.entries.len() != before {
            self.profiles = self.entries.keys().map(|k| k.profile).collect();
        }
    }

    /// Breadth-first flood over region adjacency from `src`, admitting only
    /// regions `profile` may enter whose origin lies within the horizon.
    fn flood(
        &mut self,
        graph: &NavGraph,
        src: RegionId,
        dst: RegionId,
        profile: &AccessProfile,
        stamp: u64,
    ) -> CacheEntry {
        let horizon = horizon(profile);
        let mut reachable = FxHashSet::default();
        let mut chunks = FxHashMap::default();
        let Some(origin) = self.regions.region(src).map(|r| r.origin().pos) else {
            return CacheEntry {
                stamp,
                tick: graph.tick(),
                reachable,
                chunks,
            };
        };
        // Chunks refreshed during this flood are never rebuilt again by it,
        // so handles already collected stay live.
        let mut settled: FxHashSet<ChunkKey> = [src, dst]
            .iter()
            .filter_map(|id| self.regions.region(*id).map(Region::chunk))
            .collect();
        reachable.insert(src);
        let mut queue = VecDeque::from([src]);
        while let Some(id) = queue.pop_front() {
            let Some(key) = self.regions.region(id).map(Region::chunk) else {
                continue;
            };
            chunks.insert(key, true);
            for d in Direction::CARDINAL {
                let next = key.step(d);
                chunks.entry(next).or_insert_with(|| graph.chunk(next).is_some());
                if settled.insert(next) {
                    self.regions.refresh(graph, next);
                }
            }
            let Some(region) = self.regions.region(id) else {
                continue;
            };
            for n in region.neighbors() {
                if reachable.contains(&n) {
                    continue;
                }
                let Some(other) = self.regions.region(n) else {
                    continue;
                };
                if !other.traversable_for(profile) {
                    continue;
                }
                if horizon.is_some_and(|h| other.origin().pos.chebyshev(origin) > h) {
                    continue;
                }
                reachable.insert(n);
                queue.push_back(n);
            }
        }
        CacheEntry {
            stamp,
            tick: graph.tick(),
            reachable,
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavConfig;
    use crate::events::GraphEvent;
    use crate::obstruction::ObstructionId;
    use tilenav_core::{CollisionMask, GridId, Point, Range, TileData, TileMap};

    const G: GridId = GridId(0);

    fn corridor(len: i32, size: i32) -> NavGraph {
        let mut map = TileMap::new();
        map.fill(G, Range::new(0, 0, len, 1), TileData::FLOOR);
        let mut g = NavGraph::new(NavConfig::default().with_chunk_size(size), map);
        g.load_range(G, Range::new(0, 0, len, 1));
        g
    }

    fn t(x: i32) -> TileRef {
        TileRef::new(G, x, 0)
    }

    fn agent(x: i32, vision: u32) -> Agent {
        Agent::new(t(x), AccessProfile::default().with_vision_radius(vision))
    }

    #[test]
    fn reflexive_even_on_own_obstruction() {
        let g = corridor(4, 4);
        g.apply_sync(&GraphEvent::ObstructionAdded {
            id: ObstructionId(1),
            tile: t(1),
            layer: CollisionMask::layer(0),
        });
        let me = Agent::new(t(1), AccessProfile::default().with_collision(CollisionMask::layer(0)));
        let mut cache = RegionCache::new();
        assert!(cache.can_access(&g, &me, t(1), 0));
        assert!(cache.can_access(&g, &me, t(3), 0));
    }

    #[test]
    fn other_grid_and_walls() {
        let mut g = corridor(8, 4);
        let mut cache = RegionCache::new();
        assert!(!cache.can_access(&g, &agent(0, 0), TileRef::new(GridId(9), 0, 0), 3));
        g.apply(GraphEvent::TileChanged { tile: t(7), data: TileData::WALL });
        assert!(!cache.can_access(&g, &agent(0, 0), t(7), 0));
        assert!(cache.can_access(&g, &agent(0, 0), t(7), 1));
        assert!(!cache.can_access(&g, &agent(0, 0), t(40), 2));
    }

    #[test]
    fn horizon_and_guarded_reuse() {
        let g = corridor(32, 4);
        let mut cache = RegionCache::new();
        assert!(cache.can_access(&g, &agent(0, 2), t(6), 0));
        assert_eq!(cache.len(), 1);
        // A wider horizon reuses the narrower positive answer.
        assert!(cache.can_access(&g, &agent(0, 6), t(6), 0));
        assert_eq!(cache.len(), 1);
        // ...but a negative one is recomputed at the wider horizon.
        assert!(!cache.can_access(&g, &agent(0, 2), t(12), 0));
        assert!(cache.can_access(&g, &agent(0, 6), t(12), 0));
        assert_eq!(cache.len(), 2);
        // A narrower horizon never borrows from a wider one.
        assert!(!cache.can_access(&g, &agent(0, 1), t(12), 0));
        assert_eq!(cache.len(), 3);
        assert!(cache.can_access(&g, &agent(0, 0), t(31), 0));
    }

    #[test]
    fn entries_expire_with_chunk_stamps() {
        let mut g = corridor(12, 4);
        let mut cache = RegionCache::new();
        let a = agent(0, 0);
        assert!(cache.can_access(&g, &a, t(11), 0));
        g.apply(GraphEvent::TileChanged { tile: t(5), data: TileData::WALL });
        // Still within the minimum lifetime: the old answer stands.
        assert!(cache.can_access(&g, &a, t(11), 0));
        g.advance_tick();
        assert!(!cache.can_access(&g, &a, t(11), 0));
        g.apply(GraphEvent::TileChanged { tile: t(5), data: TileData::FLOOR });
        g.advance_tick();
        assert!(cache.can_access(&g, &a, t(11), 0));
    }

    #[test]
    fn rebuilt_destination_chunk_keeps_answer() {
        let mut map = TileMap::new();
        map.fill(G, Range::new(0, 0, 8, 3), TileData::FLOOR);
        let mut g = NavGraph::new(NavConfig::default().with_chunk_size(4), map);
        g.load_range(G, Range::new(0, 0, 8, 3));
        let mut cache = RegionCache::new();
        let a = Agent::new(TileRef::new(G, 0, 1), AccessProfile::default());
        let target = TileRef::new(G, 7, 1);
        assert!(cache.can_access(&g, &a, target, 0));
        // A layer the agent ignores, in the target's chunk, on the same tick.
        g.apply_sync(&GraphEvent::ObstructionAdded {
            id: ObstructionId(3),
            tile: TileRef::new(G, 7, 2),
            layer: CollisionMask::layer(5),
        });
        assert!(cache.can_access(&g, &a, target, 0));
        assert!(cache.can_access(&g, &a, TileRef::new(G, 7, 2), 0));
    }

    #[test]
    fn removed_grid_leaves_nothing_behind() {
        let mut map = TileMap::new();
        map.fill(G, Range::new(0, 0, 8, 1), TileData::FLOOR);
        map.fill(GridId(1), Range::new(0, 0, 8, 1), TileData::FLOOR);
        let mut g = NavGraph::new(NavConfig::default().with_chunk_size(4), map);
        g.load_range(G, Range::new(0, 0, 8, 1));
        g.load_range(GridId(1), Range::new(0, 0, 8, 1));
        let mut cache = RegionCache::new();
        assert!(cache.can_access(&g, &agent(0, 0), t(7), 0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.regions().len(), 2);

        g.apply(GraphEvent::GridRemoved { grid: G });
        let elsewhere = Agent::new(TileRef::new(GridId(1), 0, 0), AccessProfile::default());
        assert!(!cache.can_access(&g, &elsewhere, t(7), 0));
        assert!(cache.regions().is_empty());
        assert!(cache.is_empty());

        assert!(cache.can_access(&g, &elsewhere, TileRef::new(GridId(1), 7, 0), 0));
        assert_eq!(cache.regions().len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn huge_range_is_bounded() {
        let mut g = corridor(8, 4);
        g.apply(GraphEvent::TileChanged { tile: t(7), data: TileData::WALL });
        let mut cache = RegionCache::new();
        assert!(cache.can_access(&g, &agent(0, 0), t(7), u32::MAX));
        assert!(!cache.can_access(&g, &agent(0, 0), t(400), u32::MAX));
    }

    #[test]
    fn new_neighbor_chunk_invalidates() {
        let mut map = TileMap::new();
        map.fill(G, Range::new(0, 0, 8, 1), TileData::FLOOR);
        let mut g = NavGraph::new(NavConfig::default().with_chunk_size(4), map);
        g.ensure_chunk(t(0));
        let mut cache = RegionCache::new();
        let a = agent(0, 0);
        assert!(!cache.can_access(&g, &a, t(7), 0));
        g.ensure_chunk(t(4));
        g.advance_tick();
        assert!(cache.can_access(&g, &a, t(7), 0));
        assert_eq!(cache.region(cache.regions().regions_in(g.chunk_key(t(4)))[0]).map(Region::len), Some(4));
        assert_eq!(cache.region_of(&g, TileRef::at(G, Point::new(5, 0))), cache.region_of(&g, t(7)));
    }
}
