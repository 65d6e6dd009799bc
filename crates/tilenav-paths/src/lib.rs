//! Pathfinding and reachability for agents on mutable tile grids.
//!
//! The world is covered lazily by a chunked navigation graph
//! ([`NavGraph`]) built from a [`TileSource`](tilenav_core::TileSource).
//! On top of it this crate provides:
//!
//! - **A\*** single-pair search with octile, Manhattan or Chebyshev
//!   estimates and destination proximity relaxation ([`find_path`])
//! - **Region reachability**: chunk-local regions, their adjacency graph and
//!   a per-profile reachability cache ([`RegionCache::can_access`])
//! - **Scheduling**: searches on a worker pool, interleaved with graph
//!   mutation batches under a readers/writer discipline ([`PathScheduler`])
//!
//! # Mutations
//!
//! World changes are reported as [`GraphEvent`]s, usually through an
//! [`EventFeed`]. Obstruction add/remove are cheap point updates applied
//! immediately; tile changes, obstruction moves and grid removal are
//! batched. Every mutation bumps the modification stamp of the chunks it
//! touches, which is how regions and cached reachability notice.
//!
//! # Example
//!
//! ```
//! use tilenav_core::{GridId, Point, Range, TileMap, TileRef};
//! use tilenav_paths::{NavConfig, NavGraph, PathRequest, find_path};
//!
//! let grid = GridId(0);
//! let mut map = TileMap::new();
//! map.load_layout(grid, Point::ZERO, "....\n.##.\n....").unwrap();
//!
//! let mut graph = NavGraph::new(NavConfig::default(), map);
//! graph.load_range(grid, Range::new(0, 0, 4, 3));
//!
//! let req = PathRequest::new(TileRef::new(grid, 0, 1), TileRef::new(grid, 3, 1));
//! let route = find_path(&graph, &req).unwrap();
//! assert_eq!(route.tiles.first(), Some(&Point::new(0, 1)));
//! assert_eq!(route.tiles.last(), Some(&Point::new(3, 1)));
//! ```

mod astar;
mod chunk;
mod config;
mod error;
mod events;
mod frontier;
mod graph;
mod heuristic;
mod node;
mod obstruction;
mod profile;
mod reach;
mod region;
mod scheduler;
mod trace;

#[cfg(test)]
mod tests;

pub use astar::{PathRequest, Route, find_path, find_path_traced};
pub use chunk::{Chunk, ChunkKey};
pub use config::NavConfig;
pub use error::{NavError, PathError};
pub use events::{EventFeed, GraphEvent};
pub use frontier::Frontier;
pub use graph::{GraphStats, NavGraph};
pub use heuristic::{Heuristic, StepCosts};
pub use node::Node;
pub use obstruction::{ObstructionId, ObstructionRegistry};
pub use profile::{AccessProfile, Agent};
pub use reach::RegionCache;
pub use region::{Region, RegionGraph, RegionId};
pub use scheduler::{CancelToken, PathHandle, PathScheduler, TickReport};
pub use trace::SearchTrace;
