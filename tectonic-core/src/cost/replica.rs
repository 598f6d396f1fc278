//! Replica co-location costs
//!
//! Replicas of one region sharing a host or rack defeat the point of
//! replication, so these carry the largest weights in the set. The group
//! primary lists are sorted, so co-located replicas show up as runs of equal
//! values; a run of length k costs `(k-1)^2`.

use crate::cost::{scale, CostFunction};
use crate::model::ClusterModel;

/// Co-location cost of one group's sorted primary list
pub fn colocation_cost(primaries: &[usize]) -> u64 {
    let mut cost = 0;
    let mut run_start = 0;
    for at in 1..=primaries.len() {
        if at == primaries.len() || primaries[at] != primaries[run_start] {
            let run = (at - run_start) as u64;
            if run > 1 {
                cost += (run - 1) * (run - 1);
            }
            run_start = at;
        }
    }
    cost
}

/// Worst-case co-location cost: every replica stacked into one group
fn max_colocation_cost(model: &ClusterModel) -> u64 {
    if !model.has_replicas {
        return 0;
    }
    let mut primaries = model.region_to_primary.clone();
    primaries.sort_unstable();
    colocation_cost(&primaries)
}

/// Replicas of one region sharing a host
///
/// Grouped per host when any host runs multiple servers, per server
/// otherwise.
pub struct ReplicaHostCost {
    multiplier: f32,
    max_cost: u64,
    costs_per_group: Vec<u64>,
    by_host: bool,
}

impl ReplicaHostCost {
    pub fn new(multiplier: f32) -> Self {
        Self {
            multiplier,
            max_cost: 0,
            costs_per_group: Vec::new(),
            by_host: false,
        }
    }
}

impl CostFunction for ReplicaHostCost {
    fn name(&self) -> &'static str {
        "region_replica_host"
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn is_needed(&self, model: &ClusterModel) -> bool {
        model.has_replicas
    }

    fn init(&mut self, model: &ClusterModel) {
        self.max_cost = if model.num_hosts() > 1 {
            max_colocation_cost(model)
        } else {
            0
        };
        self.by_host = model.multi_servers_per_host;
        let groups = if self.by_host {
            &model.primaries_of_regions_per_host
        } else {
            &model.primaries_of_regions_per_server
        };
        self.costs_per_group = groups.iter().map(|g| colocation_cost(g)).collect();
    }

    fn region_moved(&mut self, model: &ClusterModel, _region: usize, from: usize, to: usize) {
        if self.max_cost == 0 {
            return;
        }
        if self.by_host {
            let from_host = model.server_to_host[from];
            let to_host = model.server_to_host[to];
            if from_host != to_host {
                self.costs_per_group[from_host] =
                    colocation_cost(&model.primaries_of_regions_per_host[from_host]);
                self.costs_per_group[to_host] =
                    colocation_cost(&model.primaries_of_regions_per_host[to_host]);
            }
        } else {
            self.costs_per_group[from] =
                colocation_cost(&model.primaries_of_regions_per_server[from]);
            self.costs_per_group[to] = colocation_cost(&model.primaries_of_regions_per_server[to]);
        }
    }

    fn cost(&self, _model: &ClusterModel) -> f64 {
        if self.max_cost == 0 {
            return 0.0;
        }
        let total: u64 = self.costs_per_group.iter().sum();
        // square root keeps a single co-located pair expensive as the cluster
        // grows
        scale(0.0, self.max_cost as f64, total as f64).sqrt()
    }
}

/// Replicas of one region sharing a rack
///
/// Disabled on single-rack clusters.
pub struct ReplicaRackCost {
    multiplier: f32,
    max_cost: u64,
    costs_per_group: Vec<u64>,
}

impl ReplicaRackCost {
    pub fn new(multiplier: f32) -> Self {
        Self {
            multiplier,
            max_cost: 0,
            costs_per_group: Vec::new(),
        }
    }
}

impl CostFunction for ReplicaRackCost {
    fn name(&self) -> &'static str {
        "region_replica_rack"
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn is_needed(&self, model: &ClusterModel) -> bool {
        model.has_replicas
    }

    fn init(&mut self, model: &ClusterModel) {
        if model.num_racks() <= 1 {
            self.max_cost = 0;
            self.costs_per_group.clear();
            return;
        }
        self.max_cost = max_colocation_cost(model);
        self.costs_per_group = model
            .primaries_of_regions_per_rack
            .iter()
            .map(|g| colocation_cost(g))
            .collect();
    }

    fn region_moved(&mut self, model: &ClusterModel, _region: usize, from: usize, to: usize) {
        if self.max_cost == 0 {
            return;
        }
        let from_rack = model.server_to_rack[from];
        let to_rack = model.server_to_rack[to];
        if from_rack != to_rack {
            self.costs_per_group[from_rack] =
                colocation_cost(&model.primaries_of_regions_per_rack[from_rack]);
            self.costs_per_group[to_rack] =
                colocation_cost(&model.primaries_of_regions_per_rack[to_rack]);
        }
    }

    fn cost(&self, _model: &ClusterModel) -> f64 {
        if self.max_cost == 0 {
            return 0.0;
        }
        let total: u64 = self.costs_per_group.iter().sum();
        scale(0.0, self.max_cost as f64, total as f64).sqrt()
    }
}
