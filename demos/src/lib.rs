//! Demo scenarios for the tilenav crates.
//!
//! [`cave`] grows cellular automata caves into a
//! [`TileMap`](tilenav_core::TileMap); [`patrol`] fills one with walkers
//! driven by a [`PathScheduler`](tilenav_paths::PathScheduler).

pub mod cave;
pub mod patrol;

pub use cave::{Cave, CaveParams, CaveRule};
pub use patrol::{Patrol, PatrolConfig, PatrolStats};
