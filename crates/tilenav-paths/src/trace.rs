use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use tilenav_core::{Point, TileRef};

/// What a single search did, for debug tooling.
///
/// Produced by [`find_path_traced`](crate::find_path_traced) and, when a
/// diagnostics receiver is attached, streamed by the
/// [`PathScheduler`](crate::PathScheduler) for every completed search.
#[derive(Debug, Clone, Default)]
pub struct SearchTrace {
    pub start: Option<TileRef>,
    /// The tile the search aimed for, after proximity relaxation.
    pub goal: Option<TileRef>,
    /// Reconstructed route; empty when the search failed.
    pub route: Vec<Point>,
    /// Every expanded node.
    pub closed: FxHashSet<Point>,
    /// Best known cost from the start for every node reached.
    pub costs: FxHashMap<Point, f32>,
    pub elapsed: Duration,
}

impl SearchTrace {
    /// Whether the search produced a route.
    pub fn succeeded(&self) -> bool {
        !self.route.is_empty()
    }

    /// Nodes reached but never expanded.
    pub fn open(&self) -> impl Iterator<Item = Point> + '_ {
        self.costs
            .keys()
            .copied()
            .filter(|p| !self.closed.contains(p))
    }
}
