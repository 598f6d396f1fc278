//! Costs from rolling per-region load history
//!
//! Request counters are cumulative, so those functions work on the mean of
//! the first differences across the sample window, turning monotone counters
//! into rates. Store file size is compared as an absolute level. Per-region
//! values are fixed for one invocation and computed up front; only the
//! per-server grouping changes as the optimizer moves regions.

use crate::cost::{cost_from_array, CostFunction};
use crate::model::types::RegionLoad;
use crate::model::ClusterModel;

/// Skew cost over a per-server sum of per-region load values
pub struct RegionLoadCost {
    name: &'static str,
    multiplier: f32,
    as_rate: bool,
    sample: fn(&RegionLoad) -> f64,
    per_region: Vec<f64>,
}

impl RegionLoadCost {
    pub fn read_requests(multiplier: f32) -> Self {
        Self {
            name: "read_request",
            multiplier,
            as_rate: true,
            sample: |load| load.read_requests as f64,
            per_region: Vec::new(),
        }
    }

    pub fn write_requests(multiplier: f32) -> Self {
        Self {
            name: "write_request",
            multiplier,
            as_rate: true,
            sample: |load| load.write_requests as f64,
            per_region: Vec::new(),
        }
    }

    pub fn memstore_size(multiplier: f32) -> Self {
        Self {
            name: "memstore_size",
            multiplier,
            as_rate: true,
            sample: |load| load.memstore_size_mb as f64,
            per_region: Vec::new(),
        }
    }

    pub fn storefile_size(multiplier: f32) -> Self {
        Self {
            name: "storefile_size",
            multiplier,
            as_rate: false,
            sample: |load| load.storefile_size_mb as f64,
            per_region: Vec::new(),
        }
    }
}

/// Mean of the first differences over the sample window, clamped at zero.
/// A window of fewer than two samples carries no rate information.
fn rate_cost(samples: &[RegionLoad], sample: fn(&RegionLoad) -> f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mut cost = 0.0;
    let mut previous = sample(&samples[0]);
    for load in &samples[1..] {
        let current = sample(load);
        cost += current - previous;
        previous = current;
    }
    (cost / (samples.len() - 1) as f64).max(0.0)
}

/// Mean level over the sample window
fn level_cost(samples: &[RegionLoad], sample: fn(&RegionLoad) -> f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(sample).sum::<f64>() / samples.len() as f64
}

impl CostFunction for RegionLoadCost {
    fn name(&self) -> &'static str {
        self.name
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn init(&mut self, model: &ClusterModel) {
        self.per_region = model
            .region_loads
            .iter()
            .map(|samples| {
                if self.as_rate {
                    rate_cost(samples, self.sample)
                } else {
                    level_cost(samples, self.sample)
                }
            })
            .collect();
    }

    fn cost(&self, model: &ClusterModel) -> f64 {
        let stats: Vec<f64> = model
            .regions_per_server
            .iter()
            .map(|regions| regions.iter().map(|&r| self.per_region[r]).sum())
            .collect();
        cost_from_array(&stats)
    }
}
