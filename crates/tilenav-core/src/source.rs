//! World access: the [`TileSource`] trait and an in-memory [`TileMap`].

use std::fmt;

use rustc_hash::FxHashMap;

use crate::geom::{Point, Range};
use crate::tile::{AccessTags, GridId, TileData, TileRef};

/// Read access to tile content.
///
/// The navigation graph calls this when it builds a chunk. Returning `None`
/// means there is no tile there, which is never traversable.
pub trait TileSource {
    fn tile(&self, tile: TileRef) -> Option<TileData>;

    /// Every present tile within Euclidean distance `radius` of `center`.
    fn tiles_within(&self, center: TileRef, radius: i32) -> Vec<(TileRef, TileData)> {
        let r2 = (radius.max(0) as i64) * (radius.max(0) as i64);
        Range::around(center.pos, radius)
            .iter()
            .filter(|p| p.dist_sq(center.pos) <= r2)
            .filter_map(|p| {
                let t = center.with_pos(p);
                self.tile(t).map(|d| (t, d))
            })
            .collect()
    }
}

impl<S: TileSource + ?Sized> TileSource for Box<S> {
    fn tile(&self, tile: TileRef) -> Option<TileData> {
        (**self).tile(tile)
    }
}

/// A sparse, in-memory tile store.
#[derive(Debug, Clone, Default)]
pub struct TileMap {
    grids: FxHashMap<GridId, FxHashMap<Point, TileData>>,
}

impl TileMap {
    /// An empty map with no grids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) the content of one tile.
    pub fn set(&mut self, tile: TileRef, data: TileData) {
        self.grids.entry(tile.grid).or_default().insert(tile.pos, data);
    }

    /// Remove a tile, leaving empty space.
    pub fn clear(&mut self, tile: TileRef) {
        if let Some(g) = self.grids.get_mut(&tile.grid) {
            g.remove(&tile.pos);
        }
    }

    /// Fill every tile of `rng` on `grid` with `data`.
    pub fn fill(&mut self, grid: GridId, rng: Range, data: TileData) {
        let g = self.grids.entry(grid).or_default();
        for p in rng {
            g.insert(p, data);
        }
    }

    /// Drop every tile of `grid`.
    pub fn remove_grid(&mut self, grid: GridId) {
        self.grids.remove(&grid);
    }

    /// Number of stored tiles on `grid`.
    pub fn len(&self, grid: GridId) -> usize {
        self.grids.get(&grid).map_or(0, |g| g.len())
    }

    /// Load a text layout with its top-left character at `origin`.
    ///
    /// | char        | tile                                   |
    /// |-------------|----------------------------------------|
    /// | `.`         | floor                                  |
    /// | `1`..=`9`   | floor with that step cost              |
    /// | `#`         | wall                                   |
    /// | `+`         | door with no access requirement        |
    /// | `A`..=`Z`   | door requiring tag `ch - 'A'`          |
    /// | space / `_` | no tile                                |
    ///
    /// Lines may have different widths. Leading and trailing blank lines
    /// are ignored.
    pub fn load_layout(&mut self, grid: GridId, origin: Point, layout: &str) -> Result<(), LayoutError> {
        let lines: Vec<&str> = layout.trim_matches('\n').lines().collect();
        let mut parsed = Vec::new();
        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let pos = origin.shift(x as i32, y as i32);
                let data = match ch {
                    '.' => Some(TileData::FLOOR),
                    '#' => Some(TileData::WALL),
                    '+' => Some(TileData::door(AccessTags::NONE)),
                    '1'..='9' => Some(TileData::floor_with_cost(ch as u8 - b'0')),
                    'A'..='Z' => Some(TileData::door(AccessTags::tag(ch as u8 - b'A'))),
                    ' ' | '_' => None,
                    _ => {
                        return Err(LayoutError {
                            ch,
                            pos: Point::new(x as i32, y as i32),
                        });
                    }
                };
                parsed.push((pos, data));
            }
        }
        for (pos, data) in parsed {
            let tile = TileRef::at(grid, pos);
            match data {
                Some(d) => self.set(tile, d),
                None => self.clear(tile),
            }
        }
        Ok(())
    }
}

impl TileSource for TileMap {
    fn tile(&self, tile: TileRef) -> Option<TileData> {
        self.grids.get(&tile.grid)?.get(&tile.pos).copied()
    }
}

/// A layout contained a character with no tile meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutError {
    pub ch: char,
    /// Position relative to the layout's top-left corner.
    pub pos: Point,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layout contains invalid character {:?} at {}", self.ch, self.pos)
    }
}

impl std::error::Error for LayoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    const G: GridId = GridId(1);

    #[test]
    fn layout_parsing() {
        let mut map = TileMap::new();
        map.load_layout(G, Point::new(10, 20), "\n.#\n3A\n+ \n").unwrap();
        assert_eq!(map.tile(TileRef::new(G, 10, 20)), Some(TileData::FLOOR));
        assert_eq!(map.tile(TileRef::new(G, 11, 20)), Some(TileData::WALL));
        assert_eq!(map.tile(TileRef::new(G, 10, 21)).unwrap().cost, 3);
        assert_eq!(
            map.tile(TileRef::new(G, 11, 21)),
            Some(TileData::door(AccessTags::tag(0)))
        );
        assert_eq!(
            map.tile(TileRef::new(G, 10, 22)),
            Some(TileData::door(AccessTags::NONE))
        );
        assert_eq!(map.tile(TileRef::new(G, 11, 22)), None);
        assert_eq!(map.len(G), 5);
    }

    #[test]
    fn layout_rejects_unknown_chars() {
        let mut map = TileMap::new();
        let err = map.load_layout(G, Point::ZERO, "..\n.?").unwrap_err();
        assert_eq!(err.ch, '?');
        assert_eq!(err.pos, Point::new(1, 1));
        // Nothing is written on error.
        assert_eq!(map.len(G), 0);
    }

    #[test]
    fn tiles_within_is_circular() {
        let mut map = TileMap::new();
        map.fill(G, Range::new(-5, -5, 6, 6), TileData::FLOOR);
        let found = map.tiles_within(TileRef::new(G, 0, 0), 2);
        // Lattice points of a radius-2 disc.
        assert_eq!(found.len(), 13);
        assert!(found.iter().all(|(t, _)| t.pos.dist_sq(Point::ZERO) <= 4));
    }

    #[test]
    fn grids_are_independent() {
        let mut map = TileMap::new();
        map.set(TileRef::new(G, 0, 0), TileData::FLOOR);
        assert_eq!(map.tile(TileRef::new(GridId(2), 0, 0)), None);
        map.remove_grid(G);
        assert_eq!(map.tile(TileRef::new(G, 0, 0)), None);
    }
}
