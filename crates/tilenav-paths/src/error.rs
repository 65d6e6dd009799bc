use thiserror::Error;
use tilenav_core::TileRef;

/// Why a path search produced no route.
///
/// None of these are exceptional: callers are expected to treat them as a
/// soft planning failure and pick another goal or retry after the next
/// mutation batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("start {start} and end {end} are on different grids")]
    CrossGrid { start: TileRef, end: TileRef },

    /// The tile has no navigation node (its chunk was never built).
    #[error("no navigation node at {0}")]
    UnknownTile(TileRef),

    #[error("destination {0} is blocked and no open tile is in range")]
    DestinationBlocked(TileRef),

    #[error("no path from {start} to {end}")]
    NoPath { start: TileRef, end: TileRef },

    #[error("search gave up after expanding {expanded} nodes")]
    ExpansionLimit { expanded: usize },

    #[error("path request was cancelled before it started")]
    Cancelled,

    #[error("path scheduler shut down before answering")]
    SchedulerClosed,
}

/// Failures setting up the navigation services.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("failed to start search workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
