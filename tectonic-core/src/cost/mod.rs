//! Cost functions
//!
//! Each function reduces the cluster model to a scalar in `[0, 1]`,
//! multiplied by its configured weight and summed into the total the
//! optimizer minimizes. Functions keep their own incremental state, updated
//! through `post_action` after every applied and every undone action.

pub mod load;
pub mod locality;
pub mod move_cost;
pub mod replica;
pub mod skew;
pub mod table_skew;

pub use load::RegionLoadCost;
pub use locality::LocalityCost;
pub use move_cost::MoveCost;
pub use replica::{ReplicaHostCost, ReplicaRackCost};
pub use skew::{PrimaryRegionCountSkewCost, RegionCountSkewCost};
pub use table_skew::TableSkewCost;

use crate::config::BalancerConfig;
use crate::model::{Action, ClusterModel};

/// One term of the weighted cluster cost
pub trait CostFunction {
    /// Stable name used in logs and reports
    fn name(&self) -> &'static str;

    /// Weight of this function in the total; zero or less disables it
    fn multiplier(&self) -> f32;

    /// Whether this function applies to the cluster at hand (replica
    /// functions disable themselves when no replicas exist)
    fn is_needed(&self, _model: &ClusterModel) -> bool {
        true
    }

    /// Called once per balance invocation, before the search starts
    fn init(&mut self, _model: &ClusterModel) {}

    /// Called after every applied action, including undo actions. The model
    /// already reflects the action.
    fn post_action(&mut self, model: &ClusterModel, action: &Action) {
        match *action {
            Action::Null => {}
            // Assigns only happen while seeding placements, outside the
            // search loop; incremental state is rebuilt by init before any
            // search begins.
            Action::Assign { .. } => {}
            Action::Move { region, from, to } => self.region_moved(model, region, from, to),
            Action::Swap {
                region_a,
                server_a,
                region_b,
                server_b,
            } => self.region_swapped(model, region_a, server_a, region_b, server_b),
        }
    }

    fn region_moved(&mut self, _model: &ClusterModel, _region: usize, _from: usize, _to: usize) {}

    fn region_swapped(
        &mut self,
        model: &ClusterModel,
        region_a: usize,
        server_a: usize,
        region_b: usize,
        server_b: usize,
    ) {
        self.region_moved(model, region_a, server_a, server_b);
        self.region_moved(model, region_b, server_b, server_a);
    }

    /// Current cost in `[0, 1]`
    fn cost(&self, model: &ClusterModel) -> f64;
}

/// Scale `value` into `[0, 1]` between `min` and `max`
pub fn scale(min: f64, max: f64, value: f64) -> f64 {
    if max <= min || value <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Scaled dispersion of a zero-sum stat distribution
///
/// The worst case puts all mass on one element; the best case is the nearest
/// integer partition of the total across all elements. The returned value is
/// the actual total deviation from the mean, scaled between those two.
pub fn cost_from_array(stats: &[f64]) -> f64 {
    let count = stats.len() as f64;
    let total: f64 = stats.iter().sum();
    let mean = total / count;

    let max = (count - 1.0) * mean + (total - mean);
    let min = if count > total {
        (count - total) * mean + (1.0 - mean) * total
    } else {
        // some elements hold one more than the others
        let num_high = total - mean.floor() * count;
        let num_low = count - num_high;
        num_high * (mean.ceil() - mean) + num_low * (mean - mean.floor())
    };
    let min = min.max(0.0);

    let dispersion: f64 = stats.iter().map(|&n| (mean - n).abs()).sum();
    scale(min, max, dispersion)
}

/// Assemble the full cost function set for one invocation
pub fn build_cost_functions(config: &BalancerConfig) -> Vec<Box<dyn CostFunction>> {
    let m = &config.multipliers;
    vec![
        Box::new(RegionCountSkewCost::new(m.region_count_skew)),
        Box::new(PrimaryRegionCountSkewCost::new(m.primary_region_count_skew)),
        Box::new(MoveCost::new(m.move_cost, config.max_move_percent)),
        Box::new(LocalityCost::new(m.locality)),
        Box::new(TableSkewCost::new(m.table_skew, config.max_table_skew_weight)),
        Box::new(ReplicaHostCost::new(m.region_replica_host)),
        Box::new(ReplicaRackCost::new(m.region_replica_rack)),
        Box::new(RegionLoadCost::read_requests(m.read_request)),
        Box::new(RegionLoadCost::write_requests(m.write_request)),
        Box::new(RegionLoadCost::memstore_size(m.memstore_size)),
        Box::new(RegionLoadCost::storefile_size(m.storefile_size)),
    ]
}

/// Weighted total cost with early-out
///
/// Skips disabled functions, accumulates `multiplier * cost` into `scratch`,
/// and stops as soon as the running total exceeds `previous` (the best cost
/// seen so far). Entries of `scratch` past an early-out keep stale values;
/// callers only read `scratch` after a full evaluation, which is guaranteed
/// whenever the returned total improves on `previous`.
pub fn compute_weighted_cost(
    functions: &[Box<dyn CostFunction>],
    model: &ClusterModel,
    previous: f64,
    scratch: &mut [f64],
) -> f64 {
    let mut total = 0.0;
    for (i, function) in functions.iter().enumerate() {
        scratch[i] = 0.0;
        let multiplier = function.multiplier();
        if multiplier <= 0.0 {
            continue;
        }
        scratch[i] = multiplier as f64 * function.cost(model);
        total += scratch[i];
        if total > previous {
            break;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_bounds() {
        assert_eq!(scale(0.0, 10.0, 0.0), 0.0);
        assert_eq!(scale(0.0, 10.0, 10.0), 1.0);
        assert_eq!(scale(0.0, 10.0, 5.0), 0.5);
        // degenerate ranges collapse to zero
        assert_eq!(scale(5.0, 5.0, 7.0), 0.0);
        assert_eq!(scale(10.0, 0.0, 5.0), 0.0);
        // values below min clamp to zero
        assert_eq!(scale(2.0, 4.0, 1.0), 0.0);
    }

    #[test]
    fn test_cost_from_array_extremes() {
        // all mass on one element is the worst case
        assert_eq!(cost_from_array(&[10.0, 0.0]), 1.0);
        assert_eq!(cost_from_array(&[0.0, 0.0, 12.0]), 1.0);
        // even distribution is free
        assert_eq!(cost_from_array(&[5.0, 5.0]), 0.0);
        assert_eq!(cost_from_array(&[4.0, 4.0, 4.0]), 0.0);
    }

    #[test]
    fn test_cost_from_array_uneven_total() {
        // 7 over 3 elements: best case is 3/2/2, so [3,2,2] costs nothing
        assert_eq!(cost_from_array(&[3.0, 2.0, 2.0]), 0.0);
        // and a skewed layout costs something strictly between 0 and 1
        let skewed = cost_from_array(&[5.0, 1.0, 1.0]);
        assert!(skewed > 0.0 && skewed < 1.0);
    }

    #[test]
    fn test_cost_from_array_fewer_items_than_slots() {
        // 2 regions over 4 servers: [1,1,0,0] is as even as it gets
        assert_eq!(cost_from_array(&[1.0, 1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cost_from_array(&[2.0, 0.0, 0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_cost_from_array_monotone_in_dispersion() {
        let better = cost_from_array(&[6.0, 5.0, 4.0]);
        let worse = cost_from_array(&[9.0, 3.0, 3.0]);
        assert!(better < worse);
    }
}
