use tilenav_core::{Direction, Point};

use crate::config::NavConfig;

/// Base cost of one step, before the destination tile's cost multiplier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepCosts {
    pub orthogonal: f32,
    pub diagonal: f32,
}

impl StepCosts {
    /// Step costs configured in `config`.
    pub fn from_config(config: &NavConfig) -> Self {
        Self {
            orthogonal: config.orthogonal_cost,
            diagonal: config.diagonal_cost,
        }
    }

    /// Cost of one step in `dir` before the tile multiplier.
    #[inline]
    pub fn base(&self, dir: Direction) -> f32 {
        if dir.is_diagonal() {
            self.diagonal
        } else {
            self.orthogonal
        }
    }
}

impl Default for StepCosts {
    fn default() -> Self {
        Self::from_config(&NavConfig::default())
    }
}

/// Distance estimate used to order the search frontier.
///
/// Tile costs are never below 1, so each estimate is a lower bound on the
/// real cost whenever it is a lower bound on the step count weighted by the
/// base step costs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Heuristic {
    /// `|dx| + |dy| - min(|dx|,|dy|)` with the diagonal part weighted by
    /// the diagonal cost. Admissible for 8-way movement.
    #[default]
    Octile,
    /// `|dx| + |dy|`. Only admissible when a diagonal step costs at least
    /// two orthogonal ones.
    Manhattan,
    /// `max(|dx|,|dy|)`. Admissible, but looser than octile.
    Chebyshev,
}

impl Heuristic {
    /// Estimated cost from `from` to `to`.
    pub fn estimate(self, costs: &StepCosts, from: Point, to: Point) -> f32 {
        let d = from.abs_delta(to);
        let (lo, hi) = (d.x.min(d.y) as f32, d.x.max(d.y) as f32);
        match self {
            Heuristic::Octile => costs.orthogonal * (hi - lo) + costs.diagonal * lo,
            Heuristic::Manhattan => costs.orthogonal * (hi + lo),
            Heuristic::Chebyshev => costs.orthogonal * hi,
        }
    }
}
