//! **tilenav-core**: geometry and tile primitives for chunked tile-grid
//! navigation.
//!
//! This crate provides the foundational types used across the *tilenav*
//! crates: integer points and rectangles, 8-way directions, tile identity,
//! terrain content, and the [`TileSource`] accessor through which the
//! navigation graph reads the world.

pub mod dir;
pub mod geom;
pub mod source;
pub mod tile;

pub use dir::Direction;
pub use geom::{Point, Range};
pub use source::{LayoutError, TileMap, TileSource};
pub use tile::{AccessTags, CollisionMask, GridId, TileData, TileRef};
