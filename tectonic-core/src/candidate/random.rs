//! Uniform random move/swap generator

use rand::rngs::StdRng;

use crate::candidate::{
    pick_other_random_server, pick_random_regions, pick_random_server, CandidateGenerator,
};
use crate::model::{Action, ClusterModel};

/// Picks two distinct servers at random and lets the region dance decide
/// between a move, a swap, or nothing
pub struct RandomCandidateGenerator;

impl CandidateGenerator for RandomCandidateGenerator {
    fn name(&self) -> &'static str {
        "random"
    }

    fn generate(&self, model: &ClusterModel, rng: &mut StdRng) -> Action {
        let Some(this_server) = pick_random_server(model, rng) else {
            return Action::Null;
        };
        let Some(other_server) = pick_other_random_server(model, rng, this_server) else {
            return Action::Null;
        };
        pick_random_regions(model, rng, this_server, other_server)
    }
}
