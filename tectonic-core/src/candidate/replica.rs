//! Replica-colocation-driven generator

use rand::rngs::StdRng;
use rand::Rng;

use crate::candidate::{
    pick_other_random_host, pick_other_random_rack, pick_random_host, pick_random_rack,
    select_colocated_replica, CandidateGenerator, RandomCandidateGenerator,
};
use crate::model::{Action, ClusterModel};

/// Breaks up co-located replicas: picks a colocated set on a random rack and
/// moves one of its secondaries to a different rack
///
/// Falls back to host-level colocation when the rack level finds nothing,
/// and to the random generator after that.
pub struct ReplicaColocationCandidateGenerator;

impl CandidateGenerator for ReplicaColocationCandidateGenerator {
    fn name(&self) -> &'static str {
        "replica_colocation"
    }

    fn generate(&self, model: &ClusterModel, rng: &mut StdRng) -> Action {
        if model.num_racks() > 1 {
            if let Some(rack) = pick_random_rack(model, rng) {
                if let Some(region) = select_colocated_replica(
                    rng,
                    &model.primaries_of_regions_per_rack[rack],
                    &model.regions_per_rack[rack],
                    &model.region_to_primary,
                ) {
                    if let Some(to_rack) = pick_other_random_rack(model, rng, rack) {
                        let from = model.region_to_server[region];
                        let servers = &model.servers_per_rack[to_rack];
                        let to = servers[rng.gen_range(0..servers.len())];
                        return Action::Move { region, from, to };
                    }
                }
            }
        }

        if model.num_hosts() > 1 {
            if let Some(host) = pick_random_host(model, rng) {
                if let Some(region) = select_colocated_replica(
                    rng,
                    &model.primaries_of_regions_per_host[host],
                    &model.regions_per_host[host],
                    &model.region_to_primary,
                ) {
                    if let Some(to_host) = pick_other_random_host(model, rng, host) {
                        let from = model.region_to_server[region];
                        let servers = &model.servers_per_host[to_host];
                        let to = servers[rng.gen_range(0..servers.len())];
                        return Action::Move { region, from, to };
                    }
                }
            }
        }

        RandomCandidateGenerator.generate(model, rng)
    }
}
