use std::time::Instant;

use log::{trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use tilenav_core::{GridId, Point, Range, TileRef};

use crate::error::PathError;
use crate::frontier::Frontier;
use crate::graph::NavGraph;
use crate::heuristic::{Heuristic, StepCosts};
use crate::profile::AccessProfile;
use crate::trace::SearchTrace;

/// A single-pair route query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathRequest {
    pub start: TileRef,
    pub end: TileRef,
    /// If `end` cannot be entered, aim for the nearest tile within this
    /// Euclidean radius that can. `0` disables the relaxation.
    pub proximity: u32,
    pub heuristic: Heuristic,
    pub profile: AccessProfile,
}

impl PathRequest {
    /// A request from `start` to `end` with no proximity, the octile
    /// estimate and the default profile.
    pub fn new(start: TileRef, end: TileRef) -> Self {
        Self {
            start,
            end,
            proximity: 0,
            heuristic: Heuristic::default(),
            profile: AccessProfile::default(),
        }
    }

    /// Accept the nearest open tile within `radius` when `end` is blocked.
    pub fn with_proximity(mut self, radius: u32) -> Self {
        self.proximity = radius;
        self
    }

    /// Use `heuristic` to order the frontier.
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Search as an agent with `profile`.
    pub fn with_profile(mut self, profile: AccessProfile) -> Self {
        self.profile = profile;
        self
    }
}

/// An ordered tile sequence from start to goal, both included.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub grid: GridId,
    pub tiles: Vec<Point>,
    /// Accumulated step cost.
    pub cost: f32,
}

impl Route {
    /// Number of tiles, start and end included.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The first tile of the route.
    pub fn start(&self) -> Option<TileRef> {
        self.tiles.first().map(|p| TileRef::at(self.grid, *p))
    }

    /// The tile actually reached, which differs from the requested end
    /// when proximity relaxation kicked in.
    pub fn end(&self) -> Option<TileRef> {
        self.tiles.last().map(|p| TileRef::at(self.grid, *p))
    }

    /// Whether the route passes through `p`.
    pub fn contains(&self, p: Point) -> bool {
        self.tiles.contains(&p)
    }

    /// The route's tiles, start first.
    pub fn iter(&self) -> impl Iterator<Item = TileRef> + '_ {
        self.tiles.iter().map(|p| TileRef::at(self.grid, *p))
    }
}

/// Compute a least-cost route for `req` over the current graph.
///
/// Only built chunks are searched. Failures are values, see [`PathError`].
pub fn find_path(graph: &NavGraph, req: &PathRequest) -> Result<Route, PathError> {
    run(graph, req, &mut Explored::default())
}

/// Like [`find_path`], also returning what the search explored.
pub fn find_path_traced(graph: &NavGraph, req: &PathRequest) -> (Result<Route, PathError>, SearchTrace) {
    let started = Instant::now();
    let mut explored = Explored::default();
    let result = run(graph, req, &mut explored);
    let trace = SearchTrace {
        start: Some(req.start),
        goal: explored.goal,
        route: result.as_ref().map(|r| r.tiles.clone()).unwrap_or_default(),
        closed: explored.closed,
        costs: explored.g,
        elapsed: started.elapsed(),
    };
    (result, trace)
}

/// The nearest tile to `target` within Euclidean distance `radius` that an
/// agent with `profile` may enter. Ties go to the first tile in row-major
/// order. `radius` is clamped to `max_proximity`.
pub(crate) fn nearest_open_tile(
    graph: &NavGraph,
    target: TileRef,
    radius: u32,
    profile: &AccessProfile,
) -> Option<TileRef> {
    let r = radius.min(graph.config().max_proximity).min(i32::MAX as u32) as i32;
    let r2 = i64::from(r) * i64::from(r);
    Range::around(target.pos, r)
        .iter()
        .filter(|p| p.dist_sq(target.pos) <= r2)
        .filter(|p| graph.is_traversable(target.with_pos(*p), profile))
        .min_by_key(|p| (p.dist_sq(target.pos), *p))
        .map(|p| target.with_pos(p))
}

#[derive(Default)]
struct Explored {
    goal: Option<TileRef>,
    g: FxHashMap<Point, f32>,
    closed: FxHashSet<Point>,
}

fn resolve_goal(graph: &NavGraph, req: &PathRequest) -> Result<TileRef, PathError> {
    let end = req.end;
    if graph.is_traversable(end, &req.profile) {
        return Ok(end);
    }
    if req.proximity > 0 {
        let found = nearest_open_tile(graph, end, req.proximity, &req.profile);
        if let Some(goal) = found {
            trace!("destination {end} blocked, retargeting to {goal}");
        }
        return found.ok_or(PathError::DestinationBlocked(end));
    }
    if graph.node(end).is_none() {
        Err(PathError::UnknownTile(end))
    } else {
        Err(PathError::DestinationBlocked(end))
    }
}

fn run(graph: &NavGraph, req: &PathRequest, ex: &mut Explored) -> Result<Route, PathError> {
    let PathRequest { start, end, .. } = *req;
    if start.grid != end.grid {
        return Err(PathError::CrossGrid { start, end });
    }
    if graph.node(start).is_none() {
        return Err(PathError::UnknownTile(start));
    }
    let goal = resolve_goal(graph, req)?;
    ex.goal = Some(goal);
    let grid = start.grid;
    let (from, to) = (start.pos, goal.pos);
    ex.g.insert(from, 0.0);
    if from == to {
        return Ok(Route {
            grid,
            tiles: vec![from],
            cost: 0.0,
        });
    }

    let config = graph.config();
    let costs = StepCosts::from_config(config);
    let tie_break = config.tie_break;
    let estimate = |p: Point| req.heuristic.estimate(&costs, p, to) * tie_break;
    let can_enter = |p: Point| graph.is_traversable(TileRef::at(grid, p), &req.profile);

    let mut parent: FxHashMap<Point, Point> = FxHashMap::default();
    let mut open = Frontier::new();
    open.push(from, estimate(from));

    let found = 'search: loop {
        let Some(p) = open.pop() else {
            break 'search false;
        };
        if ex.closed.contains(&p) {
            continue;
        }
        if p == to {
            break 'search true;
        }
        ex.closed.insert(p);
        let expanded = ex.closed.len();
        if config.max_expansions.is_some_and(|max| expanded > max) {
            warn!("search {start} -> {goal} gave up after {expanded} expansions");
            return Err(PathError::ExpansionLimit { expanded });
        }

        let Some(node) = graph.node(TileRef::at(grid, p)) else {
            continue;
        };
        let g = ex.g.get(&p).copied().unwrap_or(f32::INFINITY);
        for (d, q) in node.neighbors() {
            if ex.closed.contains(&q) {
                continue;
            }
            let Some(next) = graph.node(TileRef::at(grid, q)) else {
                continue;
            };
            if !next.traversable_for(&req.profile) {
                continue;
            }
            let squeezed = d
                .components()
                .is_some_and(|(a, b)| !(can_enter(p.step(a)) && can_enter(p.step(b))));
            if squeezed {
                continue;
            }
            let tentative = g + costs.base(d) * next.cost();
            if tentative < ex.g.get(&q).copied().unwrap_or(f32::INFINITY) {
                ex.g.insert(q, tentative);
                parent.insert(q, p);
                open.push(q, tentative + estimate(q));
            }
        }
    };

    if !found {
        return Err(PathError::NoPath { start, end });
    }

    let mut tiles = vec![to];
    let mut cur = to;
    while let Some(&prev) = parent.get(&cur) {
        tiles.push(prev);
        cur = prev;
    }
    tiles.reverse();
    debug_assert_eq!(tiles.first(), Some(&from));
    Ok(Route {
        grid,
        tiles,
        cost: ex.g.get(&to).copied().unwrap_or_default(),
    })
}
