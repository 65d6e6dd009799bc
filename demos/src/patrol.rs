//! A crowd of walkers roaming a cave through the path scheduler.
//!
//! Each walker is an obstruction on layer 0 and avoids that layer itself,
//! so walkers route around each other. Every tick a few of them pick new
//! goals, check reachability first, and queue a search; walkers with a
//! route take one step, reported back to the graph as an obstruction move.
//! Rockfalls wall off random tiles for a while to force replanning.

use std::collections::VecDeque;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilenav_core::{CollisionMask, GridId, Point, TileData, TileRef, TileSource};
use tilenav_paths::{
    AccessProfile, Agent, CancelToken, EventFeed, NavConfig, NavError, NavGraph, ObstructionId, PathError,
    PathHandle, PathRequest, PathScheduler, Route, TickReport,
};

use crate::cave::{Cave, CaveParams};

const WALKER_LAYER: u8 = 0;

#[derive(Clone, Debug)]
pub struct PatrolConfig {
    pub seed: u64,
    pub walkers: usize,
    pub vision_radius: u32,
    /// Chance per tick that a rockfall walls off a random tile.
    pub rockfall_chance: f64,
    /// Ticks a rockfall stays before it is cleared.
    pub rockfall_ticks: u64,
    /// Chance per tick that a waiting walker gives up on its search.
    pub impatience: f64,
    /// Wait for every dispatched search at the end of each tick. Makes a
    /// run reproducible from its seed.
    pub lockstep: bool,
    pub nav: NavConfig,
    pub cave: CaveParams,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            walkers: 24,
            vision_radius: 0,
            rockfall_chance: 0.2,
            rockfall_ticks: 25,
            impatience: 0.02,
            lockstep: false,
            nav: NavConfig::default(),
            cave: CaveParams::default(),
        }
    }
}

/// Running totals for a patrol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatrolStats {
    pub ticks: u64,
    pub requests: u64,
    pub routes: u64,
    pub route_tiles: u64,
    pub failures: u64,
    pub unreachable: u64,
    pub cancelled: u64,
    pub steps: u64,
    pub blocked_steps: u64,
    pub rockfalls: u64,
    pub deferred_ticks: u64,
}

#[derive(Debug)]
struct Walker {
    id: ObstructionId,
    agent: Agent,
    route: VecDeque<Point>,
    pending: Option<PathHandle>,
}

#[derive(Debug)]
struct Rockfall {
    tile: TileRef,
    until: u64,
}

pub struct Patrol {
    config: PatrolConfig,
    cave: Cave,
    scheduler: PathScheduler,
    feed: EventFeed,
    walkers: Vec<Walker>,
    rockfalls: Vec<Rockfall>,
    rng: StdRng,
    stats: PatrolStats,
}

impl Patrol {
    /// Generate the cave, build its whole graph and place the walkers.
    pub fn new(config: PatrolConfig) -> Result<Self, NavError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let grid = GridId(0);
        let cave = Cave::generate(&mut rng, grid, &config.cave);

        let mut graph = NavGraph::new(config.nav.clone(), cave.map.clone());
        let built = graph.load_range(grid, cave.bounds);
        info!(
            "cave {}x{}: {} ground tiles, {} chunks",
            cave.bounds.width(),
            cave.bounds.height(),
            cave.ground.len(),
            built
        );

        let scheduler = PathScheduler::new(graph)?;
        let feed = scheduler.feed();
        let profile = AccessProfile::default()
            .with_vision_radius(config.vision_radius)
            .with_collision(CollisionMask::layer(WALKER_LAYER));
        let mut walkers: Vec<Walker> = Vec::with_capacity(config.walkers);
        for i in 0..config.walkers {
            let Some(tile) = cave.random_ground(&mut rng) else {
                break;
            };
            if walkers.iter().any(|w| w.agent.tile == tile) {
                continue;
            }
            let id = ObstructionId(i as u64);
            feed.obstruction_added(id, tile, CollisionMask::layer(WALKER_LAYER));
            walkers.push(Walker {
                id,
                agent: Agent::new(tile, profile),
                route: VecDeque::new(),
                pending: None,
            });
        }

        Ok(Self {
            config,
            cave,
            scheduler,
            feed,
            walkers,
            rockfalls: Vec::new(),
            rng,
            stats: PatrolStats::default(),
        })
    }

    pub fn stats(&self) -> PatrolStats {
        self.stats
    }

    pub fn cave(&self) -> &Cave {
        &self.cave
    }

    pub fn scheduler(&self) -> &PathScheduler {
        &self.scheduler
    }

    /// Where each walker stands.
    pub fn walker_tiles(&self) -> impl Iterator<Item = TileRef> + '_ {
        self.walkers.iter().map(|w| w.agent.tile)
    }

    /// Run `ticks` steps and return the totals.
    pub fn run(&mut self, ticks: u64) -> PatrolStats {
        for _ in 0..ticks {
            self.step();
        }
        self.stats
    }

    /// One simulation tick: weather, walkers, then the scheduler.
    pub fn step(&mut self) -> TickReport {
        self.weather();
        for i in 0..self.walkers.len() {
            self.act(i);
        }
        let report = self.scheduler.tick();
        if report.async_deferred > 0 {
            self.stats.deferred_ticks += 1;
        }
        if self.config.lockstep {
            for i in 0..self.walkers.len() {
                if let Some(handle) = self.walkers[i].pending.take() {
                    let result = handle.wait();
                    self.settle(i, result);
                }
            }
        }
        self.stats.ticks += 1;
        report
    }

    fn weather(&mut self) {
        let now = self.stats.ticks;
        let (expired, kept): (Vec<Rockfall>, Vec<Rockfall>) =
            self.rockfalls.drain(..).partition(|r| r.until <= now);
        self.rockfalls = kept;
        for rock in expired {
            let data = self.cave.map.tile(rock.tile).unwrap_or(TileData::FLOOR);
            self.feed.tile_changed(rock.tile, data);
        }

        if !self.rng.random_bool(self.config.rockfall_chance.clamp(0.0, 1.0)) {
            return;
        }
        let Some(tile) = self.cave.random_ground(&mut self.rng) else {
            return;
        };
        let occupied = self.walkers.iter().any(|w| w.agent.tile == tile);
        let buried = self.rockfalls.iter().any(|r| r.tile == tile);
        if occupied || buried {
            return;
        }
        debug!("rockfall at {tile}");
        self.feed.tile_changed(tile, TileData::WALL);
        self.rockfalls.push(Rockfall {
            tile,
            until: now + self.config.rockfall_ticks,
        });
        self.stats.rockfalls += 1;
    }

    fn act(&mut self, i: usize) {
        if let Some(handle) = self.walkers[i].pending.take() {
            if self.rng.random_bool(self.config.impatience.clamp(0.0, 1.0)) {
                handle.cancel();
            }
            match handle.try_result() {
                Some(result) => self.settle(i, result),
                None => self.walkers[i].pending = Some(handle),
            }
            return;
        }

        let Some(&next) = self.walkers[i].route.front() else {
            self.plan(i);
            return;
        };
        let walker = &self.walkers[i];
        let to = walker.agent.tile.with_pos(next);
        let open = self.scheduler.graph().is_traversable(to, &walker.agent.profile);
        if !open {
            self.stats.blocked_steps += 1;
            self.walkers[i].route.clear();
            self.plan(i);
            return;
        }
        let walker = &mut self.walkers[i];
        self.feed.obstruction_moved(walker.id, walker.agent.tile, to);
        walker.agent.tile = to;
        walker.route.pop_front();
        self.stats.steps += 1;
    }

    /// Pick a goal the walker can reach and queue a search for it.
    fn plan(&mut self, i: usize) {
        let Some(goal) = self.cave.random_ground(&mut self.rng) else {
            return;
        };
        let agent = self.walkers[i].agent;
        if !self.scheduler.can_access(&agent, goal, 1) {
            self.stats.unreachable += 1;
            return;
        }
        let request = PathRequest::new(agent.tile, goal)
            .with_proximity(1)
            .with_profile(agent.profile);
        let handle = self.scheduler.request_path(request, CancelToken::new());
        self.walkers[i].pending = Some(handle);
        self.stats.requests += 1;
    }

    fn settle(&mut self, i: usize, result: Result<Route, PathError>) {
        match result {
            Ok(route) => {
                self.stats.routes += 1;
                self.stats.route_tiles += route.len() as u64;
                let walker = &mut self.walkers[i];
                let here = walker.agent.tile.pos;
                walker.route = route.tiles.into_iter().skip_while(|p| *p == here).collect();
            }
            Err(PathError::Cancelled) => self.stats.cancelled += 1,
            Err(e) => {
                debug!("walker {:?}: {e}", self.walkers[i].id);
                self.stats.failures += 1;
            }
        }
    }
}
