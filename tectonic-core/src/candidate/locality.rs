//! Locality-driven generator

use rand::rngs::StdRng;

use crate::candidate::{
    pick_other_random_server, pick_random_regions, pick_random_server, CandidateGenerator,
};
use crate::model::{Action, ClusterModel};

/// Moves a server's worst-placed region toward a lightly loaded server that
/// actually holds its data blocks
///
/// Without any locality data this degrades to the random generator's
/// behavior.
pub struct LocalityCandidateGenerator;

impl CandidateGenerator for LocalityCandidateGenerator {
    fn name(&self) -> &'static str {
        "locality"
    }

    fn generate(&self, model: &ClusterModel, rng: &mut StdRng) -> Action {
        if !model.has_locality_data {
            let Some(this_server) = pick_random_server(model, rng) else {
                return Action::Null;
            };
            let Some(other_server) = pick_other_random_server(model, rng, this_server) else {
                return Action::Null;
            };
            return pick_random_regions(model, rng, this_server, other_server);
        }

        let Some(server) = pick_random_server(model, rng) else {
            return Action::Null;
        };
        let Some(region) = model.lowest_locality_region_on(server) else {
            return Action::Null;
        };
        let Some(target) = model.least_loaded_server_with_locality_for(region, server) else {
            return Action::Null;
        };
        Action::Move {
            region,
            from: server,
            to: target,
        }
    }
}
