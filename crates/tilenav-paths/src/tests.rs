//! Cross-module behavior: the corridor scenarios, border stitching and A*
//! optimality against exhaustive Dijkstra.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tilenav_core::{AccessTags, CollisionMask, Direction, GridId, Point, Range, TileData, TileMap, TileRef};

use crate::*;

const G: GridId = GridId(3);

fn t(x: i32, y: i32) -> TileRef {
    TileRef::new(G, x, y)
}

fn graph(map: TileMap, config: NavConfig, range: Range) -> NavGraph {
    let mut g = NavGraph::new(config, map);
    g.load_range(G, range);
    g
}

/// A 10-tile corridor along y = 0 with an open row beneath it, inside a
/// single 16×16 chunk.
fn corridor() -> NavGraph {
    let mut map = TileMap::new();
    map.fill(G, Range::new(0, 0, 10, 2), TileData::FLOOR);
    graph(map, NavConfig::default(), Range::new(0, 0, 16, 16))
}

fn route_cost(g: &NavGraph, route: &Route) -> f32 {
    let costs = StepCosts::from_config(g.config());
    route
        .tiles
        .windows(2)
        .map(|w| {
            let d = w[0].direction_to(w[1]).expect("consecutive tiles are adjacent");
            let from = g.node(TileRef::at(route.grid, w[0])).expect("route node");
            assert!(from.has_link(d), "{} -> {} is not linked", w[0], w[1]);
            let to = g.node(TileRef::at(route.grid, w[1])).expect("route node");
            costs.base(d) * to.cost()
        })
        .sum()
}

#[test]
fn trivial_route_for_every_open_tile() {
    let g = corridor();
    for x in 0..10 {
        let r = find_path(&g, &PathRequest::new(t(x, 1), t(x, 1))).unwrap();
        assert_eq!(r.tiles, vec![Point::new(x, 1)]);
    }
}

#[test]
fn straight_corridor() {
    let g = corridor();
    let r = find_path(&g, &PathRequest::new(t(0, 0), t(9, 0))).unwrap();
    assert_eq!(r.len(), 10);
    assert!((r.cost - 9.0).abs() < 1e-5);
    assert!((route_cost(&g, &r) - r.cost).abs() < 1e-4);
}

#[test]
fn blocked_corridor_detours() {
    let mut g = corridor();
    g.apply(GraphEvent::TileChanged {
        tile: t(5, 0),
        data: TileData::WALL,
    });
    let r = find_path(&g, &PathRequest::new(t(0, 0), t(9, 0))).unwrap();
    assert!(!r.contains(Point::new(5, 0)));
    assert!(r.contains(Point::new(5, 1)));
    assert!(r.cost > 9.0);
    assert!((route_cost(&g, &r) - r.cost).abs() < 1e-4);
}

#[test]
fn blocked_route_tile_is_avoided_on_requery() {
    let g = corridor();
    let profile = AccessProfile::default().with_collision(CollisionMask::layer(1));
    let req = PathRequest::new(t(0, 0), t(9, 0)).with_profile(profile);
    let first = find_path(&g, &req).unwrap();
    for (i, p) in first.tiles[1..first.len() - 1].iter().enumerate() {
        g.apply_sync(&GraphEvent::ObstructionAdded {
            id: ObstructionId(i as u64),
            tile: TileRef::at(G, *p),
            layer: CollisionMask::layer(1),
        });
        let again = find_path(&g, &req).unwrap();
        assert!(!again.contains(*p), "route still crosses {p}");
        g.apply_sync(&GraphEvent::ObstructionRemoved {
            id: ObstructionId(i as u64),
        });
    }
}

#[test]
fn door_reclassification_gates_reachability() {
    let mut map = TileMap::new();
    map.fill(G, Range::new(0, 0, 10, 1), TileData::FLOOR);
    let mut g = graph(map, NavConfig::default(), Range::new(0, 0, 16, 16));
    let mut cache = RegionCache::new();
    let stranger = Agent::new(t(0, 0), AccessProfile::default());
    let keyholder = Agent::new(t(0, 0), AccessProfile::default().with_access(AccessTags::tag(3)));
    assert!(cache.can_access(&g, &stranger, t(9, 0), 0));

    g.apply(GraphEvent::TileChanged {
        tile: t(5, 0),
        data: TileData::door(AccessTags::tag(3)),
    });
    g.advance_tick();
    let door = cache.region_of(&g, t(5, 0)).unwrap();
    assert!(cache.region(door).unwrap().is_door());
    assert_eq!(cache.region(door).unwrap().len(), 1);

    assert!(!cache.can_access(&g, &stranger, t(9, 0), 0));
    assert!(cache.can_access(&g, &keyholder, t(9, 0), 0));
    // Same answers from the cache on a repeated query.
    assert!(!cache.can_access(&g, &stranger, t(9, 0), 0));
    assert!(cache.can_access(&g, &keyholder, t(9, 0), 0));
    assert!(cache.can_access(&g, &stranger, t(4, 0), 0));

    let r = find_path(&g, &PathRequest::new(t(0, 0), t(9, 0)).with_profile(keyholder.profile));
    assert_eq!(r.map(|r| r.len()), Ok(10));
    assert!(find_path(&g, &PathRequest::new(t(0, 0), t(9, 0))).is_err());
}

#[test]
fn reachability_follows_mutations() {
    let mut map = TileMap::new();
    map.fill(G, Range::new(0, 0, 24, 3), TileData::FLOOR);
    let mut g = graph(
        map,
        NavConfig::default().with_chunk_size(8),
        Range::new(0, 0, 24, 3),
    );
    let mut cache = RegionCache::new();
    let a = Agent::new(t(0, 1), AccessProfile::default());
    assert!(cache.can_access(&g, &a, t(23, 1), 0));
    for y in 0..3 {
        g.apply(GraphEvent::TileChanged {
            tile: t(12, y),
            data: TileData::WALL,
        });
    }
    g.advance_tick();
    assert!(!cache.can_access(&g, &a, t(23, 1), 0));
    assert!(cache.can_access(&g, &a, t(11, 1), 0));
    g.apply(GraphEvent::TileChanged {
        tile: t(12, 2),
        data: TileData::FLOOR,
    });
    g.advance_tick();
    assert!(cache.can_access(&g, &a, t(23, 1), 0));
}

/// Cross-chunk links leaving chunk `(0, 0)`.
fn border_edges(g: &NavGraph) -> Vec<(Point, Point)> {
    let key = g.chunk_key(t(0, 0));
    let chunk = g.chunk(key).unwrap();
    let mut edges: Vec<_> = chunk
        .nodes()
        .flat_map(|n| n.neighbors().map(move |(_, q)| (n.pos(), q)))
        .filter(|(_, q)| !chunk.contains(*q))
        .collect();
    edges.sort();
    edges
}

#[test]
fn stitching_only_links_through_the_gap() {
    let mut map = TileMap::new();
    map.fill(G, Range::new(0, 0, 8, 4), TileData::FLOOR);
    for y in [0, 2, 3] {
        map.set(t(3, y), TileData::WALL);
    }
    let config = NavConfig::default().with_chunk_size(4);
    for order in [[0, 4], [4, 0]] {
        let mut g = NavGraph::new(config.clone(), map.clone());
        for x in order {
            g.ensure_chunk(t(x, 0));
        }
        assert_eq!(border_edges(&g), vec![(Point::new(3, 1), Point::new(4, 1))]);
        let east = g.node(t(4, 1)).unwrap();
        assert!(east.has_link(Direction::West));
        for y in [0, 2] {
            let n = g.node(t(4, y)).unwrap();
            assert!(!n.has_link(Direction::West));
            assert!(!n.has_link(Direction::NorthWest));
            assert!(!n.has_link(Direction::SouthWest));
        }
    }
}

#[test]
fn stitching_is_idempotent() {
    let mut map = TileMap::new();
    map.fill(G, Range::new(0, 0, 12, 12), TileData::FLOOR);
    let mut g = NavGraph::new(NavConfig::default().with_chunk_size(4), map);
    g.load_range(G, Range::new(0, 0, 12, 12));
    let before = border_edges(&g);
    g.ensure_chunk(t(5, 5));
    g.load_range(G, Range::new(0, 0, 12, 12));
    assert_eq!(border_edges(&g), before);
    let center = g.chunk(g.chunk_key(t(5, 5))).unwrap();
    assert_eq!(center.neighbors().count(), 8);
    // Interior corner node of the middle chunk sees all eight neighbors.
    assert_eq!(g.node(t(4, 4)).unwrap().links(), 0xFF);
}

fn random_map(rng: &mut StdRng, size: i32) -> TileMap {
    let mut map = TileMap::new();
    for p in Range::new(0, 0, size, size) {
        let data = if rng.random_bool(0.25) {
            TileData::WALL
        } else {
            TileData::floor_with_cost(rng.random_range(1..=4u8))
        };
        map.set(TileRef::at(G, p), data);
    }
    map
}

/// Exhaustive single-source costs over the graph's links.
fn dijkstra(g: &NavGraph, from: Point) -> FxHashMap<Point, f32> {
    let costs = StepCosts::from_config(g.config());
    let mut dist = FxHashMap::default();
    let mut open = Frontier::new();
    dist.insert(from, 0.0f32);
    open.push(from, 0.0);
    while let Some((p, d)) = open.pop_with_priority() {
        if d > dist.get(&p).copied().unwrap_or(f32::INFINITY) {
            continue;
        }
        let Some(node) = g.node(TileRef::at(G, p)) else {
            continue;
        };
        for (dir, q) in node.neighbors() {
            let Some(next) = g.node(TileRef::at(G, q)) else {
                continue;
            };
            let nd = d + costs.base(dir) * next.cost();
            if nd < dist.get(&q).copied().unwrap_or(f32::INFINITY) {
                dist.insert(q, nd);
                open.push(q, nd);
            }
        }
    }
    dist
}

#[test]
fn astar_matches_dijkstra_on_random_maps() {
    let mut rng = StdRng::seed_from_u64(0x7113_a5);
    let size = 24;
    let config = NavConfig::default().with_chunk_size(8).with_max_expansions(None);
    for _ in 0..6 {
        let map = random_map(&mut rng, size);
        let g = graph(map, config.clone(), Range::new(0, 0, size, size));
        let open: Vec<Point> = Range::new(0, 0, size, size)
            .iter()
            .filter(|p| g.node(TileRef::at(G, *p)).is_some_and(Node::is_passable))
            .collect();
        for _ in 0..10 {
            let from = open[rng.random_range(0..open.len())];
            let to = open[rng.random_range(0..open.len())];
            let best = dijkstra(&g, from);
            let result = find_path(&g, &PathRequest::new(TileRef::at(G, from), TileRef::at(G, to)));
            match best.get(&to) {
                Some(&optimal) => {
                    let route = result.unwrap();
                    assert_eq!(route.start(), Some(TileRef::at(G, from)));
                    assert_eq!(route.end(), Some(TileRef::at(G, to)));
                    assert!((route_cost(&g, &route) - route.cost).abs() < 1e-3);
                    assert!(route.cost >= optimal - 1e-3);
                    // The tie-break may trade at most its own factor.
                    assert!(
                        route.cost <= optimal * config.tie_break + 1e-3,
                        "{from} -> {to}: {} vs {optimal}",
                        route.cost
                    );
                }
                None => assert!(matches!(result, Err(PathError::NoPath { .. }))),
            }
        }
    }
}

/// Open tiles of a `size` square, as currently seen by `profile`.
fn open_tiles(g: &NavGraph, size: i32, profile: &AccessProfile) -> Vec<Point> {
    Range::new(0, 0, size, size)
        .iter()
        .filter(|p| g.is_traversable(TileRef::at(G, *p), profile))
        .collect()
}

#[test]
fn region_reachability_matches_search() {
    let mut rng = StdRng::seed_from_u64(99);
    let size = 20;
    let map = random_map(&mut rng, size);
    let mut g = graph(
        map,
        NavConfig::default()
            .with_chunk_size(5)
            .with_max_expansions(None)
            .with_min_cache_lifetime(0),
        Range::new(0, 0, size, size),
    );
    let profile = AccessProfile::default().with_collision(CollisionMask::layer(0));
    let mut cache = RegionCache::new();
    let mut next_id = 0;
    for round in 0..60 {
        // Mutate between queries without advancing the tick.
        let p = Point::new(rng.random_range(0..size), rng.random_range(0..size));
        match round % 3 {
            0 => {
                let data = if rng.random_bool(0.5) { TileData::WALL } else { TileData::FLOOR };
                g.apply(GraphEvent::TileChanged { tile: TileRef::at(G, p), data });
            }
            1 => {
                next_id += 1;
                g.apply_sync(&GraphEvent::ObstructionAdded {
                    id: ObstructionId(next_id),
                    tile: TileRef::at(G, p),
                    layer: CollisionMask::layer(0),
                });
            }
            _ => {}
        }
        let open = open_tiles(&g, size, &profile);
        let from = open[rng.random_range(0..open.len())];
        let to = Point::new(rng.random_range(0..size), rng.random_range(0..size));
        let agent = Agent::new(TileRef::at(G, from), profile);
        let reachable = cache.can_access(&g, &agent, TileRef::at(G, to), 0);
        let routed = find_path(&g, &PathRequest::new(agent.tile, TileRef::at(G, to)).with_profile(profile)).is_ok();
        assert_eq!(reachable, routed, "round {round}: {from} -> {to}");
    }
}

#[test]
fn unrelated_obstructions_keep_cached_answers_exact() {
    let mut rng = StdRng::seed_from_u64(7);
    let size = 20;
    let map = random_map(&mut rng, size);
    let g = graph(
        map,
        NavConfig::default().with_chunk_size(5).with_max_expansions(None),
        Range::new(0, 0, size, size),
    );
    let profile = AccessProfile::default();
    let open = open_tiles(&g, size, &profile);
    let mut cache = RegionCache::new();
    for round in 0..60u64 {
        // Cached entries stay trusted for this whole test; the churn splits
        // regions without changing who can reach what.
        let p = open[rng.random_range(0..open.len())];
        g.apply_sync(&GraphEvent::ObstructionAdded {
            id: ObstructionId(round),
            tile: TileRef::at(G, p),
            layer: CollisionMask::layer(5),
        });
        let from = open[rng.random_range(0..open.len())];
        let to = open[rng.random_range(0..open.len())];
        let agent = Agent::new(TileRef::at(G, from), profile);
        let reachable = cache.can_access(&g, &agent, TileRef::at(G, to), 0);
        let routed = find_path(&g, &PathRequest::new(agent.tile, TileRef::at(G, to))).is_ok();
        assert_eq!(reachable, routed, "round {round}: {from} -> {to}");
    }
}
