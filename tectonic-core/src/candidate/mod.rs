//! Candidate generators
//!
//! Stateless producers of small assignment mutations. The search loop picks
//! one generator uniformly at random each step; a `Null` action is the
//! normal signal that a generator found nothing useful to do.

pub mod load_skew;
pub mod locality;
pub mod random;
pub mod replica;

pub use load_skew::LoadSkewCandidateGenerator;
pub use locality::LocalityCandidateGenerator;
pub use random::RandomCandidateGenerator;
pub use replica::ReplicaColocationCandidateGenerator;

use rand::rngs::StdRng;
use rand::Rng;

use crate::model::{Action, ClusterModel};

/// Produces one candidate action from the current model state
pub trait CandidateGenerator {
    fn name(&self) -> &'static str;

    fn generate(&self, model: &ClusterModel, rng: &mut StdRng) -> Action;
}

pub(crate) fn pick_random_server(model: &ClusterModel, rng: &mut StdRng) -> Option<usize> {
    if model.num_servers() == 0 {
        return None;
    }
    Some(rng.gen_range(0..model.num_servers()))
}

pub(crate) fn pick_other_random_server(
    model: &ClusterModel,
    rng: &mut StdRng,
    not: usize,
) -> Option<usize> {
    if model.num_servers() < 2 {
        return None;
    }
    loop {
        let server = rng.gen_range(0..model.num_servers());
        if server != not {
            return Some(server);
        }
    }
}

pub(crate) fn pick_random_rack(model: &ClusterModel, rng: &mut StdRng) -> Option<usize> {
    if model.num_racks() == 0 {
        return None;
    }
    Some(rng.gen_range(0..model.num_racks()))
}

pub(crate) fn pick_other_random_rack(
    model: &ClusterModel,
    rng: &mut StdRng,
    not: usize,
) -> Option<usize> {
    if model.num_racks() < 2 {
        return None;
    }
    loop {
        let rack = rng.gen_range(0..model.num_racks());
        if rack != not {
            return Some(rack);
        }
    }
}

pub(crate) fn pick_random_host(model: &ClusterModel, rng: &mut StdRng) -> Option<usize> {
    if model.num_hosts() == 0 {
        return None;
    }
    Some(rng.gen_range(0..model.num_hosts()))
}

pub(crate) fn pick_other_random_host(
    model: &ClusterModel,
    rng: &mut StdRng,
    not: usize,
) -> Option<usize> {
    if model.num_hosts() < 2 {
        return None;
    }
    loop {
        let host = rng.gen_range(0..model.num_hosts());
        if host != not {
            return Some(host);
        }
    }
}

/// Pick a random region from the server, or none with probability
/// `chance_of_no_pick` (turning a potential swap into a one-sided move)
pub(crate) fn pick_random_region(
    model: &ClusterModel,
    rng: &mut StdRng,
    server: usize,
    chance_of_no_pick: f64,
) -> Option<usize> {
    let regions = &model.regions_per_server[server];
    if regions.is_empty() || rng.gen::<f64>() < chance_of_no_pick {
        return None;
    }
    Some(regions[rng.gen_range(0..regions.len())])
}

/// The two-sided region dance shared by the random and load-skew generators:
/// the heavier server always offers a region, the lighter one offers a
/// region only half the time, so mass tends to flow downhill
pub(crate) fn pick_random_regions(
    model: &ClusterModel,
    rng: &mut StdRng,
    this_server: usize,
    other_server: usize,
) -> Action {
    let this_count = model.num_regions_on_server(this_server);
    let other_count = model.num_regions_on_server(other_server);
    let this_chance = if this_count > other_count { 0.0 } else { 0.5 };
    let other_chance = if this_count <= other_count { 0.0 } else { 0.5 };

    let this_region = pick_random_region(model, rng, this_server, this_chance);
    let other_region = pick_random_region(model, rng, other_server, other_chance);
    action_from_picks(this_server, this_region, other_server, other_region)
}

/// Move when exactly one side picked a region, swap when both did
pub(crate) fn action_from_picks(
    from_server: usize,
    from_region: Option<usize>,
    to_server: usize,
    to_region: Option<usize>,
) -> Action {
    match (from_region, to_region) {
        (Some(region_a), Some(region_b)) => Action::Swap {
            region_a,
            server_a: from_server,
            region_b,
            server_b: to_server,
        },
        (Some(region), None) => Action::Move {
            region,
            from: from_server,
            to: to_server,
        },
        (None, Some(region)) => Action::Move {
            region,
            from: to_server,
            to: from_server,
        },
        (None, None) => Action::Null,
    }
}

/// Pick one co-located replica from a group, each co-located set with equal
/// probability
///
/// `primaries` is the group's sorted primary list, so co-located replicas
/// form runs of equal values. Reservoir sampling over the runs picks a set;
/// the returned region is a secondary of that set, never the primary itself.
pub(crate) fn select_colocated_replica(
    rng: &mut StdRng,
    primaries: &[usize],
    group_regions: &[usize],
    region_to_primary: &[usize],
) -> Option<usize> {
    let mut selected_primary = None;
    let mut largest_draw = -1.0f64;
    let mut run_start = 0;
    for at in 1..=primaries.len() {
        if at == primaries.len() || primaries[at] != primaries[run_start] {
            if at - run_start > 1 {
                let draw: f64 = rng.gen();
                if draw > largest_draw {
                    selected_primary = Some(primaries[run_start]);
                    largest_draw = draw;
                }
            }
            run_start = at;
        }
    }
    let primary = selected_primary?;
    group_regions
        .iter()
        .copied()
        .find(|&region| region_to_primary[region] == primary && region != primary)
}
