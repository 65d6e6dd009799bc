//! The registry of obstructions currently standing on tiles.

use rustc_hash::FxHashMap;
use tilenav_core::{CollisionMask, GridId, TileRef};

/// Identity of an obstruction (typically an entity id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObstructionId(pub u64);

/// Which obstruction stands where, and on which collision layers.
///
/// Owned by [`NavGraph`](crate::NavGraph); node blocking masks are derived
/// from it.
#[derive(Debug, Default)]
pub struct ObstructionRegistry {
    by_id: FxHashMap<ObstructionId, (TileRef, CollisionMask)>,
    by_tile: FxHashMap<TileRef, Vec<(ObstructionId, CollisionMask)>>,
}

impl ObstructionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `id` on `tile`. If it was already registered elsewhere it is
    /// moved; the previous tile is returned.
    pub fn insert(&mut self, id: ObstructionId, tile: TileRef, layer: CollisionMask) -> Option<TileRef> {
        let previous = self.remove(id).map(|(t, _)| t);
        self.by_id.insert(id, (tile, layer));
        self.by_tile.entry(tile).or_default().push((id, layer));
        previous
    }

    /// Remove `id`, returning where it stood.
    pub fn remove(&mut self, id: ObstructionId) -> Option<(TileRef, CollisionMask)> {
        let (tile, layer) = self.by_id.remove(&id)?;
        if let Some(list) = self.by_tile.get_mut(&tile) {
            list.retain(|(other, _)| *other != id);
            if list.is_empty() {
                self.by_tile.remove(&tile);
            }
        }
        Some((tile, layer))
    }

    /// Move `id` to `to`, keeping its layer. Returns the tile it left.
    pub fn relocate(&mut self, id: ObstructionId, to: TileRef) -> Option<TileRef> {
        let (_, layer) = *self.by_id.get(&id)?;
        self.insert(id, to, layer)
    }

    /// Where `id` stands and on which layers.
    pub fn get(&self, id: ObstructionId) -> Option<(TileRef, CollisionMask)> {
        self.by_id.get(&id).copied()
    }

    /// Obstructions standing on `tile`.
    pub fn at(&self, tile: TileRef) -> &[(ObstructionId, CollisionMask)] {
        self.by_tile.get(&tile).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of the layers of everything on `tile`.
    pub fn mask_at(&self, tile: TileRef) -> CollisionMask {
        self.at(tile)
            .iter()
            .fold(CollisionMask::NONE, |acc, (_, layer)| acc | *layer)
    }

    /// Drop every obstruction on `grid`.
    pub fn remove_grid(&mut self, grid: GridId) {
        self.by_id.retain(|_, (tile, _)| tile.grid != grid);
        self.by_tile.retain(|tile, _| tile.grid != grid);
    }

    /// Number of registered obstructions.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: GridId = GridId(0);

    #[test]
    fn masks_accumulate_per_tile() {
        let mut reg = ObstructionRegistry::new();
        let t = TileRef::new(G, 1, 1);
        reg.insert(ObstructionId(1), t, CollisionMask::layer(0));
        reg.insert(ObstructionId(2), t, CollisionMask::layer(3));
        assert_eq!(reg.mask_at(t), CollisionMask::layer(0) | CollisionMask::layer(3));
        reg.remove(ObstructionId(1));
        assert_eq!(reg.mask_at(t), CollisionMask::layer(3));
        reg.remove(ObstructionId(2));
        assert!(reg.at(t).is_empty());
        assert!(reg.is_empty());
    }

    #[test]
    fn reinsert_moves() {
        let mut reg = ObstructionRegistry::new();
        let a = TileRef::new(G, 0, 0);
        let b = TileRef::new(G, 5, 5);
        assert_eq!(reg.insert(ObstructionId(9), a, CollisionMask::layer(1)), None);
        assert_eq!(reg.relocate(ObstructionId(9), b), Some(a));
        assert_eq!(reg.mask_at(a), CollisionMask::NONE);
        assert_eq!(reg.mask_at(b), CollisionMask::layer(1));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.relocate(ObstructionId(10), a), None);
    }

    #[test]
    fn grid_removal() {
        let mut reg = ObstructionRegistry::new();
        reg.insert(ObstructionId(1), TileRef::new(G, 0, 0), CollisionMask::layer(0));
        reg.insert(ObstructionId(2), TileRef::new(GridId(1), 0, 0), CollisionMask::layer(0));
        reg.remove_grid(G);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(ObstructionId(1)).is_none());
        assert!(reg.get(ObstructionId(2)).is_some());
    }
}
