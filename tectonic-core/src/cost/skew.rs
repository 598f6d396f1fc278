//! Region count skew costs

use crate::cost::{cost_from_array, CostFunction};
use crate::model::ClusterModel;

/// Skew in the total number of regions per server
///
/// The most general way to balance load; carries the largest default weight
/// together with the primary skew.
pub struct RegionCountSkewCost {
    multiplier: f32,
}

impl RegionCountSkewCost {
    pub fn new(multiplier: f32) -> Self {
        Self { multiplier }
    }
}

impl CostFunction for RegionCountSkewCost {
    fn name(&self) -> &'static str {
        "region_count_skew"
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn cost(&self, model: &ClusterModel) -> f64 {
        let stats: Vec<f64> = model
            .regions_per_server
            .iter()
            .map(|regions| regions.len() as f64)
            .collect();
        cost_from_array(&stats)
    }
}

/// Skew in the number of primary replicas per server
///
/// Primaries serve the bulk of reads and writes, so their spread matters on
/// replicated clusters. Zero when no replicas exist.
pub struct PrimaryRegionCountSkewCost {
    multiplier: f32,
}

impl PrimaryRegionCountSkewCost {
    pub fn new(multiplier: f32) -> Self {
        Self { multiplier }
    }
}

impl CostFunction for PrimaryRegionCountSkewCost {
    fn name(&self) -> &'static str {
        "primary_region_count_skew"
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn is_needed(&self, model: &ClusterModel) -> bool {
        model.has_replicas
    }

    fn cost(&self, model: &ClusterModel) -> f64 {
        if !model.has_replicas {
            return 0.0;
        }
        let stats: Vec<f64> = model
            .regions_per_server
            .iter()
            .map(|regions| {
                regions
                    .iter()
                    .filter(|&&r| model.region_to_primary[r] == r)
                    .count() as f64
            })
            .collect();
        cost_from_array(&stats)
    }
}
