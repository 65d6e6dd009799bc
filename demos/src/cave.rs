//! Cellular automata caves, written straight into a [`TileMap`].

use rand::Rng;
use rand::seq::IndexedRandom;
use tilenav_core::{GridId, Point, Range, TileData, TileMap, TileRef};

/// A smoothing rule for [`Cave::generate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaveRule {
    /// A tile becomes wall with at least this many walls among its 8
    /// neighbors.
    pub w_cutoff1: i32,
    /// ...or with at most this many walls within distance 2. Negative
    /// disables the test.
    pub w_cutoff2: i32,
    /// Whether tiles outside the map count as walls.
    pub walls_out_of_range: bool,
    pub reps: usize,
}

impl Default for CaveRule {
    fn default() -> Self {
        Self {
            w_cutoff1: 5,
            w_cutoff2: 2,
            walls_out_of_range: true,
            reps: 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CaveParams {
    pub width: i32,
    pub height: i32,
    /// Initial wall density.
    pub wall_pct: f64,
    /// Share of ground tiles turned into costly mud.
    pub mud_pct: f64,
    pub mud_cost: u8,
    pub rules: Vec<CaveRule>,
}

impl Default for CaveParams {
    fn default() -> Self {
        Self {
            width: 80,
            height: 48,
            wall_pct: 0.45,
            mud_pct: 0.08,
            mud_cost: 3,
            rules: vec![
                CaveRule::default(),
                CaveRule {
                    w_cutoff2: -1,
                    reps: 3,
                    ..CaveRule::default()
                },
            ],
        }
    }
}

/// A generated cave on one grid.
#[derive(Clone, Debug)]
pub struct Cave {
    pub grid: GridId,
    pub bounds: Range,
    pub map: TileMap,
    /// Every walkable tile, row-major.
    pub ground: Vec<Point>,
}

impl Cave {
    /// Grow a cave on `grid`: random walls, then each rule in turn.
    pub fn generate<R: Rng>(rng: &mut R, grid: GridId, params: &CaveParams) -> Self {
        let bounds = Range::new(0, 0, params.width.max(1), params.height.max(1));
        let w = bounds.width();
        let idx = |p: Point| ((p.y - bounds.min.y) * w + (p.x - bounds.min.x)) as usize;

        let mut walls: Vec<bool> = bounds.iter().map(|_| rng.random::<f64>() < params.wall_pct).collect();
        let mut scratch = walls.clone();
        for rule in &params.rules {
            for _ in 0..rule.reps {
                for p in bounds.iter() {
                    let walls1 = count_walls(&walls, bounds, p, 1, rule.walls_out_of_range);
                    let walls2 = count_walls(&walls, bounds, p, 2, rule.walls_out_of_range);
                    scratch[idx(p)] = walls1 >= rule.w_cutoff1 || walls2 <= rule.w_cutoff2;
                }
                std::mem::swap(&mut walls, &mut scratch);
            }
        }

        let mud = params.mud_pct.clamp(0.0, 1.0);
        let mut map = TileMap::new();
        let mut ground = Vec::new();
        for p in bounds.iter() {
            let data = if walls[idx(p)] {
                TileData::WALL
            } else {
                ground.push(p);
                if rng.random_bool(mud) {
                    TileData::floor_with_cost(params.mud_cost)
                } else {
                    TileData::FLOOR
                }
            };
            map.set(TileRef::at(grid, p), data);
        }
        Self {
            grid,
            bounds,
            map,
            ground,
        }
    }

    pub fn tile(&self, p: Point) -> TileRef {
        TileRef::at(self.grid, p)
    }

    /// A uniformly chosen walkable tile.
    pub fn random_ground<R: Rng>(&self, rng: &mut R) -> Option<TileRef> {
        self.ground.choose(rng).map(|p| self.tile(*p))
    }
}

/// Walls within Chebyshev distance `radius` of `center`, not counting it.
fn count_walls(walls: &[bool], bounds: Range, center: Point, radius: i32, out_of_range: bool) -> i32 {
    let w = bounds.width();
    let mut count = 0;
    for p in Range::around(center, radius).iter() {
        if p == center {
            continue;
        }
        let wall = if bounds.contains(p) {
            walls[((p.y - bounds.min.y) * w + (p.x - bounds.min.x)) as usize]
        } else {
            out_of_range
        };
        if wall {
            count += 1;
        }
    }
    count
}
