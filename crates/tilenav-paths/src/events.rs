//! Graph mutation events and the channel producers push them through.

use std::sync::mpsc::Sender;

use tilenav_core::{CollisionMask, GridId, TileData, TileRef};

use crate::obstruction::ObstructionId;

/// A change in the world that the navigation graph must reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// Terrain content of a tile changed. Rewires its neighborhood.
    TileChanged { tile: TileRef, data: TileData },
    /// An obstruction appeared on a tile.
    ObstructionAdded {
        id: ObstructionId,
        tile: TileRef,
        layer: CollisionMask,
    },
    /// An obstruction went away.
    ObstructionRemoved { id: ObstructionId },
    /// An obstruction moved from one tile to another.
    ObstructionMoved {
        id: ObstructionId,
        from: TileRef,
        to: TileRef,
    },
    /// A whole grid was deleted.
    GridRemoved { grid: GridId },
}

impl GraphEvent {
    /// Synchronous events are O(1) point updates that never restructure
    /// chunk topology; they are applied as soon as they are drained.
    /// Everything else waits for the next exclusive mutation batch.
    #[inline]
    pub fn is_sync(&self) -> bool {
        matches!(
            self,
            GraphEvent::ObstructionAdded { .. } | GraphEvent::ObstructionRemoved { .. }
        )
    }
}

/// A cloneable handle world systems use to report changes.
///
/// Events are buffered until the scheduler drains them on its next tick.
/// Every method returns `false` once the scheduler is gone.
#[derive(Debug, Clone)]
pub struct EventFeed {
    tx: Sender<GraphEvent>,
}

impl EventFeed {
    pub(crate) fn new(tx: Sender<GraphEvent>) -> Self {
        Self { tx }
    }

    /// Queue `event` for the next tick.
    pub fn send(&self, event: GraphEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Report new terrain at `tile`.
    pub fn tile_changed(&self, tile: TileRef, data: TileData) -> bool {
        self.send(GraphEvent::TileChanged { tile, data })
    }

    /// Report obstruction `id` appearing on `tile`.
    pub fn obstruction_added(&self, id: ObstructionId, tile: TileRef, layer: CollisionMask) -> bool {
        self.send(GraphEvent::ObstructionAdded { id, tile, layer })
    }

    /// Report obstruction `id` disappearing.
    pub fn obstruction_removed(&self, id: ObstructionId) -> bool {
        self.send(GraphEvent::ObstructionRemoved { id })
    }

    /// Report obstruction `id` moving from `from` to `to`.
    pub fn obstruction_moved(&self, id: ObstructionId, from: TileRef, to: TileRef) -> bool {
        self.send(GraphEvent::ObstructionMoved { id, from, to })
    }

    /// Report that `grid` no longer exists.
    pub fn grid_removed(&self, grid: GridId) -> bool {
        self.send(GraphEvent::GridRemoved { grid })
    }
}
