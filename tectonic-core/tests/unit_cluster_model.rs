//! Unit tests for the cluster model
//!
//! Index coherence under random mutation sequences, undo symmetry, and
//! degenerate snapshots.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use tectonic_core::model::action::Action;
use tectonic_core::model::cluster::ClusterModel;
use tectonic_core::model::types::{
    RackResolver, RegionInfo, ServerName, SingleRackResolver,
};

fn server(n: usize) -> ServerName {
    ServerName::new(format!("host{n}.example.org"), 16020, 1000 + n as u64)
}

struct PairedRacks;

impl RackResolver for PairedRacks {
    fn rack(&self, server: &ServerName) -> String {
        // two servers per rack
        let n: usize = server
            .host
            .trim_start_matches("host")
            .split('.')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        format!("rack{}", n / 2)
    }
}

/// Six servers over three racks, three tables, some replicated regions
fn build_model() -> ClusterModel {
    let mut assignment: HashMap<ServerName, Vec<RegionInfo>> = HashMap::new();
    for s in 0..6 {
        assignment.insert(server(s), Vec::new());
    }
    let tables = ["orders", "users", "events"];
    let mut n = 0;
    for table in tables {
        for i in 0..8 {
            let id = format!("{table},{i:04}");
            let target = server(n % 6);
            assignment
                .get_mut(&target)
                .unwrap()
                .push(RegionInfo::new(id.as_str(), table));
            n += 1;
            // every third region gets a secondary replica
            if i % 3 == 0 {
                let replica = format!("{table},{i:04},replica1");
                let target = server((n + 2) % 6);
                assignment
                    .get_mut(&target)
                    .unwrap()
                    .push(RegionInfo::new(replica.as_str(), table).with_primary(id.as_str()));
                n += 1;
            }
        }
    }
    ClusterModel::build(&assignment, &HashMap::new(), None, &PairedRacks).unwrap()
}

/// Every derived index must agree with `region_to_server`
fn assert_coherent(model: &ClusterModel) {
    let num_regions = model.num_regions();

    let mut seen = vec![0usize; num_regions];
    for (s, regions) in model.regions_per_server.iter().enumerate() {
        let mut sorted = regions.clone();
        sorted.sort_unstable();
        assert_eq!(&sorted, regions, "regions_per_server[{s}] not sorted");
        for &r in regions {
            seen[r] += 1;
            assert_eq!(model.region_to_server[r], s, "region {r} in the wrong list");
        }
    }
    assert!(seen.iter().all(|&count| count == 1), "region listed twice or missing");
    assert_eq!(
        model
            .regions_per_server
            .iter()
            .map(|regions| regions.len())
            .sum::<usize>(),
        num_regions
    );

    for (groups, primaries, label) in [
        (
            &model.regions_per_server,
            &model.primaries_of_regions_per_server,
            "server",
        ),
        (
            &model.regions_per_host,
            &model.primaries_of_regions_per_host,
            "host",
        ),
        (
            &model.regions_per_rack,
            &model.primaries_of_regions_per_rack,
            "rack",
        ),
    ] {
        for (g, group) in groups.iter().enumerate() {
            assert_eq!(
                group.len(),
                primaries[g].len(),
                "primaries length mismatch for {label} {g}"
            );
            assert!(
                primaries[g].windows(2).all(|w| w[0] <= w[1]),
                "primaries for {label} {g} not sorted"
            );
            let mut expected: Vec<usize> =
                group.iter().map(|&r| model.region_to_primary[r]).collect();
            expected.sort_unstable();
            assert_eq!(expected, primaries[g], "stale primaries for {label} {g}");
        }
    }

    for r in 0..num_regions {
        let s = model.region_to_server[r];
        let host = model.server_to_host[s];
        let rack = model.server_to_rack[s];
        assert!(model.regions_per_host[host].binary_search(&r).is_ok());
        assert!(model.regions_per_rack[rack].binary_search(&r).is_ok());
    }

    for s in 0..model.num_servers() {
        for t in 0..model.num_tables() {
            let expected = model.regions_per_server[s]
                .iter()
                .filter(|&&r| model.region_to_table[r] == t)
                .count();
            assert_eq!(
                model.region_count_per_server_per_table[s][t], expected,
                "stale table count for server {s} table {t}"
            );
        }
    }

    let moved = (0..num_regions)
        .filter(|&r| model.region_to_server[r] != model.initial_region_to_server[r])
        .count();
    assert_eq!(model.num_moved_regions, moved);
}

fn random_action(model: &ClusterModel, rng: &mut StdRng) -> Action {
    let region = rng.gen_range(0..model.num_regions());
    let from = model.region_to_server[region];
    if rng.gen_bool(0.3) {
        // swap with a region on a different server, if one exists
        let other = rng.gen_range(0..model.num_regions());
        let other_server = model.region_to_server[other];
        if other_server != from {
            return Action::Swap {
                region_a: region,
                server_a: from,
                region_b: other,
                server_b: other_server,
            };
        }
    }
    let mut to = rng.gen_range(0..model.num_servers());
    if to == from {
        to = (to + 1) % model.num_servers();
    }
    Action::Move { region, from, to }
}

#[test]
fn test_indexes_stay_coherent_under_mutation() {
    let mut model = build_model();
    assert_coherent(&model);

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let action = random_action(&model, &mut rng);
        model.apply(&action);
        assert_coherent(&model);
    }
}

#[test]
fn test_undo_restores_every_index() {
    let mut model = build_model();
    let mut rng = StdRng::seed_from_u64(7);

    // walk away from the initial state first so undo is tested mid-flight
    for _ in 0..50 {
        let action = random_action(&model, &mut rng);
        model.apply(&action);
    }

    for _ in 0..200 {
        let before = model.clone();
        let action = random_action(&model, &mut rng);
        model.apply(&action);
        model.apply(&action.inverse());

        assert_eq!(model.region_to_server, before.region_to_server);
        assert_eq!(model.regions_per_server, before.regions_per_server);
        assert_eq!(model.regions_per_host, before.regions_per_host);
        assert_eq!(model.regions_per_rack, before.regions_per_rack);
        assert_eq!(
            model.primaries_of_regions_per_server,
            before.primaries_of_regions_per_server
        );
        assert_eq!(
            model.primaries_of_regions_per_host,
            before.primaries_of_regions_per_host
        );
        assert_eq!(
            model.primaries_of_regions_per_rack,
            before.primaries_of_regions_per_rack
        );
        assert_eq!(
            model.region_count_per_server_per_table,
            before.region_count_per_server_per_table
        );
        assert_eq!(model.num_moved_regions, before.num_moved_regions);

        // leave the mutation applied for the next round
        model.apply(&action);
    }
}

#[test]
fn test_initial_assignment_is_immutable() {
    let mut model = build_model();
    let snapshot = model.initial_region_to_server.clone();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let action = random_action(&model, &mut rng);
        model.apply(&action);
    }
    assert_eq!(model.initial_region_to_server, snapshot);
}

#[test]
fn test_missing_primary_degrades_to_self() {
    let mut assignment = HashMap::new();
    assignment.insert(
        server(0),
        vec![RegionInfo::new("orphan", "t").with_primary("never-seen")],
    );
    assignment.insert(server(1), vec![]);
    let model =
        ClusterModel::build(&assignment, &HashMap::new(), None, &SingleRackResolver).unwrap();
    assert_eq!(model.region_to_primary, vec![0]);
    assert!(!model.has_replicas);
}

#[test]
fn test_rack_and_host_grouping() {
    let model = build_model();
    assert_eq!(model.num_hosts(), 6);
    assert_eq!(model.num_racks(), 3);
    for rack in 0..model.num_racks() {
        assert_eq!(model.servers_per_rack[rack].len(), 2);
    }
    assert!(!model.multi_servers_per_host);
}
