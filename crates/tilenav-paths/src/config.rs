//! Tunables for the navigation graph, search and scheduler.

/// Configuration shared by [`NavGraph`](crate::NavGraph),
/// [`find_path`](crate::find_path), [`RegionCache`](crate::RegionCache) and
/// [`PathScheduler`](crate::PathScheduler).
///
/// Build one with `NavConfig::default()` and the `with_*` setters. With the
/// `serde` feature enabled it can be loaded from any serde format; missing
/// fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavConfig {
    /// Side length of a chunk, in tiles.
    pub chunk_size: i32,
    /// Base cost of a cardinal step.
    pub orthogonal_cost: f32,
    /// Base cost of a diagonal step.
    pub diagonal_cost: f32,
    /// Multiplier applied to the heuristic when ordering the frontier.
    pub tie_break: f32,
    /// Node expansions after which a single search gives up.
    /// `None` lets a search run until its frontier is empty.
    pub max_expansions: Option<usize>,
    /// Largest radius scanned when a blocked destination is relaxed to a
    /// nearby open tile. Larger requested radii are clamped to it.
    pub max_proximity: u32,
    /// Ticks during which a reachability cache entry is reused without
    /// being validated against chunk modification stamps.
    pub min_cache_lifetime: u64,
    /// Ticks an asynchronous mutation batch may be deferred while searches
    /// are still running before the scheduler blocks on them.
    pub max_mutation_interval: u32,
    /// Search worker threads. `0` lets rayon pick.
    pub worker_threads: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            orthogonal_cost: 1.0,
            diagonal_cost: std::f32::consts::SQRT_2,
            tie_break: 1.0 + 1.0 / 1000.0,
            max_expansions: Some(65_536),
            max_proximity: 32,
            min_cache_lifetime: 1,
            max_mutation_interval: 4,
            worker_threads: 0,
        }
    }
}

impl NavConfig {
    /// Set the chunk side length, at least 1.
    pub fn with_chunk_size(mut self, size: i32) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set both step costs. The diagonal cost is kept at least as large as
    /// the orthogonal one so the octile heuristic stays admissible.
    pub fn with_step_costs(mut self, orthogonal: f32, diagonal: f32) -> Self {
        self.orthogonal_cost = orthogonal.max(f32::EPSILON);
        self.diagonal_cost = diagonal.max(self.orthogonal_cost);
        self
    }

    /// Set the heuristic multiplier, at least 1.
    pub fn with_tie_break(mut self, tie_break: f32) -> Self {
        self.tie_break = tie_break.max(1.0);
        self
    }

    /// Cap node expansions per search; `None` removes the cap.
    pub fn with_max_expansions(mut self, max: Option<usize>) -> Self {
        self.max_expansions = max;
        self
    }

    /// Cap the destination relaxation radius.
    pub fn with_max_proximity(mut self, radius: u32) -> Self {
        self.max_proximity = radius;
        self
    }

    /// Trust cached reachability for `ticks` ticks without validation.
    pub fn with_min_cache_lifetime(mut self, ticks: u64) -> Self {
        self.min_cache_lifetime = ticks;
        self
    }

    /// Longest deferral of a mutation batch behind running searches.
    pub fn with_max_mutation_interval(mut self, ticks: u32) -> Self {
        self.max_mutation_interval = ticks;
        self
    }

    /// Size of the search pool; `0` lets rayon pick.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }
}
