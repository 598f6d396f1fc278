//! End-to-end balancer scenarios
//!
//! Small clusters with known optimal layouts; every run uses a fixed seed.

use std::collections::HashMap;

use tectonic_core::config::BalancerConfig;
use tectonic_core::cost::{CostFunction, RegionCountSkewCost, ReplicaRackCost, TableSkewCost};
use tectonic_core::model::cluster::ClusterModel;
use tectonic_core::model::types::{
    RackResolver, RegionInfo, RegionMove, ServerName, SingleRackResolver,
};
use tectonic_core::StochasticBalancer;

fn server(name: &str) -> ServerName {
    ServerName::new(name, 16020, 1)
}

/// Apply a plan to an assignment snapshot the way a master would
fn apply_plan(
    assignment: &HashMap<ServerName, Vec<RegionInfo>>,
    moves: &[RegionMove],
) -> HashMap<ServerName, Vec<RegionInfo>> {
    let mut result = assignment.clone();
    for mv in moves {
        let source = result.get_mut(&mv.from).expect("move from unknown server");
        let at = source
            .iter()
            .position(|r| r.id == mv.region)
            .expect("moved region not on its source server");
        let region = source.remove(at);
        result.get_mut(&mv.to).expect("move to unknown server").push(region);
    }
    result
}

#[test]
fn test_two_servers_split_evenly() {
    let mut assignment = HashMap::new();
    assignment.insert(
        server("a"),
        (0..10)
            .map(|i| RegionInfo::new(format!("r{i:02}").as_str(), "t"))
            .collect::<Vec<_>>(),
    );
    assignment.insert(server("b"), vec![]);

    let mut balancer = StochasticBalancer::with_seed(BalancerConfig::default(), 42).unwrap();
    let plan = balancer.balance(&assignment).expect("skewed cluster must produce a plan");

    assert_eq!(plan.moves.len(), 5, "exactly half the regions move");
    assert!(plan.cost_after < plan.cost_before);
    for mv in &plan.moves {
        assert_eq!(mv.from, server("a"));
        assert_eq!(mv.to, server("b"));
    }

    // the final layout carries no region count skew at all
    let rebalanced = apply_plan(&assignment, &plan.moves);
    let model =
        ClusterModel::build(&rebalanced, &HashMap::new(), None, &SingleRackResolver).unwrap();
    assert_eq!(RegionCountSkewCost::new(500.0).cost(&model), 0.0);
}

#[test]
fn test_concentrated_table_spreads_out() {
    // table "hot" sits entirely on server a; tables "warm" and "cold" are
    // already spread one region per server
    let mut assignment = HashMap::new();
    assignment.insert(
        server("a"),
        vec![
            RegionInfo::new("hot,0", "hot"),
            RegionInfo::new("hot,1", "hot"),
            RegionInfo::new("hot,2", "hot"),
            RegionInfo::new("warm,0", "warm"),
            RegionInfo::new("cold,0", "cold"),
        ],
    );
    assignment.insert(
        server("b"),
        vec![
            RegionInfo::new("warm,1", "warm"),
            RegionInfo::new("cold,1", "cold"),
        ],
    );
    assignment.insert(
        server("c"),
        vec![
            RegionInfo::new("warm,2", "warm"),
            RegionInfo::new("cold,2", "cold"),
        ],
    );

    // two regions of the hot table must leave server a
    let initial =
        ClusterModel::build(&assignment, &HashMap::new(), None, &SingleRackResolver).unwrap();
    let hot = initial.tables.iter().position(|t| t.0 == "hot").unwrap();
    assert_eq!(
        tectonic_core::cost::table_skew::moves_to_even_distribution(&initial, hot),
        2
    );

    let mut balancer = StochasticBalancer::with_seed(BalancerConfig::default(), 7).unwrap();
    let plan = balancer.balance(&assignment).expect("table skew must produce a plan");

    let rebalanced = apply_plan(&assignment, &plan.moves);
    for (name, regions) in &rebalanced {
        assert_eq!(regions.len(), 3, "{name} should hold 3 regions");
        for table in ["hot", "warm", "cold"] {
            let count = regions.iter().filter(|r| r.table.0 == table).count();
            assert_eq!(count, 1, "{name} should hold exactly one {table} region");
        }
    }

    // the final model carries no table skew
    let model =
        ClusterModel::build(&rebalanced, &HashMap::new(), None, &SingleRackResolver).unwrap();
    let mut table_skew = TableSkewCost::new(35.0, 0.0);
    table_skew.init(&model);
    assert_eq!(table_skew.cost(&model), 0.0);
}

struct PrefixRacks;

impl RackResolver for PrefixRacks {
    fn rack(&self, server: &ServerName) -> String {
        server.host.split('-').next().unwrap().to_string()
    }
}

#[test]
fn test_colocated_replicas_leave_the_rack() {
    // rack r1: servers r1-a, r1-b; rack r2: servers r2-a, r2-b.
    // all three replicas of one region start on rack r1.
    let mut assignment = HashMap::new();
    assignment.insert(
        server("r1-a"),
        vec![
            RegionInfo::new("p", "t"),
            RegionInfo::new("p,replica1", "t").with_primary("p"),
        ],
    );
    assignment.insert(
        server("r1-b"),
        vec![RegionInfo::new("p,replica2", "t").with_primary("p")],
    );
    assignment.insert(server("r2-a"), vec![]);
    assignment.insert(server("r2-b"), vec![]);

    let rack_cost_of = |assignment: &HashMap<ServerName, Vec<RegionInfo>>| {
        let model = ClusterModel::build(assignment, &HashMap::new(), None, &PrefixRacks).unwrap();
        let mut cost = ReplicaRackCost::new(10_000.0);
        cost.init(&model);
        cost.cost(&model)
    };
    assert_eq!(rack_cost_of(&assignment), 1.0);

    let mut balancer = StochasticBalancer::with_seed(BalancerConfig::default(), 21).unwrap();
    balancer.set_rack_resolver(Box::new(PrefixRacks));
    let plan = balancer
        .balance(&assignment)
        .expect("colocated replicas must produce a plan");

    let rebalanced = apply_plan(&assignment, &plan.moves);
    let on_r2: usize = rebalanced
        .iter()
        .filter(|(name, _)| name.host.starts_with("r2"))
        .map(|(_, regions)| regions.len())
        .sum();
    assert!(on_r2 >= 1, "at least one replica must reach the second rack");

    // three replicas over two racks: the best reachable split is 2+1
    assert_eq!(rack_cost_of(&rebalanced), 0.5);
}

#[test]
fn test_balanced_cluster_is_left_alone() {
    let mut assignment = HashMap::new();
    for name in ["a", "b"] {
        assignment.insert(
            server(name),
            (0..100)
                .map(|i| RegionInfo::new(format!("{name},r{i}").as_str(), "t"))
                .collect::<Vec<_>>(),
        );
    }
    let mut balancer = StochasticBalancer::with_seed(BalancerConfig::default(), 13).unwrap();
    assert!(
        balancer.balance(&assignment).is_none(),
        "a balanced cluster needs no plan"
    );
}

#[test]
fn test_single_server_cluster_is_left_alone() {
    let mut assignment = HashMap::new();
    assignment.insert(
        server("only"),
        (0..100)
            .map(|i| RegionInfo::new(format!("r{i}").as_str(), "t"))
            .collect::<Vec<_>>(),
    );
    let mut balancer = StochasticBalancer::with_seed(BalancerConfig::default(), 13).unwrap();
    assert!(balancer.balance(&assignment).is_none());
}

#[test]
fn test_report_carries_cost_accounting() {
    let mut assignment = HashMap::new();
    assignment.insert(
        server("a"),
        (0..10)
            .map(|i| RegionInfo::new(format!("r{i}").as_str(), "t"))
            .collect::<Vec<_>>(),
    );
    assignment.insert(server("b"), vec![]);

    let mut balancer = StochasticBalancer::with_seed(BalancerConfig::default(), 1).unwrap();
    let plan = balancer.balance(&assignment).unwrap();

    assert!(plan.steps > 0);
    assert_eq!(plan.function_costs.len(), 11);
    let total: f64 = plan
        .function_costs
        .iter()
        .map(|f| f.weighted_cost)
        .sum();
    assert!((total - plan.cost_after).abs() < 1e-9);
    // fractions of the final cost sum to one when the cost is nonzero
    if plan.cost_after > 0.0 {
        let fractions: f64 = plan.function_costs.iter().map(|f| f.fraction).sum();
        assert!((fractions - 1.0).abs() < 1e-9);
    }
    let names: Vec<&str> = plan.function_costs.iter().map(|f| f.name).collect();
    assert!(names.contains(&"region_count_skew"));
    assert!(names.contains(&"move_cost"));
}
