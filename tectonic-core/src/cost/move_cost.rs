//! Cost of moving regions away from their starting servers

use crate::cost::{scale, CostFunction};
use crate::model::ClusterModel;

/// Minimum number of moves a single plan is always allowed
const MAX_MOVES_FLOOR: usize = 600;

/// Sentinel returned once a candidate state exceeds the move budget; dwarfs
/// every other weighted cost so the state is always rejected
const OVER_BUDGET_COST: f64 = 1_000_000.0;

/// Penalizes states that differ from the starting assignment by many regions
///
/// Kept at the same order of magnitude as the other weights so only real
/// improvements justify churn.
pub struct MoveCost {
    multiplier: f32,
    max_move_percent: f32,
}

impl MoveCost {
    pub fn new(multiplier: f32, max_move_percent: f32) -> Self {
        Self {
            multiplier,
            max_move_percent,
        }
    }

    /// The largest plan size tolerated for this cluster
    pub fn max_moves(&self, model: &ClusterModel) -> usize {
        ((model.num_regions() as f32 * self.max_move_percent) as usize).max(MAX_MOVES_FLOOR)
    }
}

impl CostFunction for MoveCost {
    fn name(&self) -> &'static str {
        "move_cost"
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn cost(&self, model: &ClusterModel) -> f64 {
        let max_moves = self.max_moves(model);
        let moved = model.num_moved_regions;
        if moved > max_moves {
            return OVER_BUDGET_COST;
        }
        scale(
            0.0,
            model.num_regions().min(max_moves) as f64,
            moved as f64,
        )
    }
}
