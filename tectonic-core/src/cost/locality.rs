//! Data-locality cost

use crate::cost::{scale, CostFunction};
use crate::model::ClusterModel;

/// Penalizes placements that serve regions far from their data blocks
///
/// Each region contributes `1 - locality(region, current server)`. A region
/// hosted on a server absent from its (known) location ranking contributes
/// the full 1; a region with no location data at all contributes 0 and is
/// treated as optimally placed.
pub struct LocalityCost {
    multiplier: f32,
}

impl LocalityCost {
    pub fn new(multiplier: f32) -> Self {
        Self { multiplier }
    }
}

impl CostFunction for LocalityCost {
    fn name(&self) -> &'static str {
        "locality"
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn cost(&self, model: &ClusterModel) -> f64 {
        let mut max = 0.0;
        let mut cost = 0.0;
        for region in 0..model.num_regions() {
            max += 1.0;
            let locations = &model.region_locations[region];
            if locations.is_empty() {
                continue;
            }
            let server = model.region_to_server[region];
            if locations.contains(&server) {
                cost += 1.0 - model.locality_of_region(region, server) as f64;
            } else {
                cost += 1.0;
            }
        }
        scale(0.0, max, cost)
    }
}
