//! Per-table placement skew cost

use crate::cost::CostFunction;
use crate::model::ClusterModel;

/// Regions the cluster must send away to reach an even per-server spread of
/// the given table
///
/// An even spread puts the ceiling count on `regions mod servers` servers and
/// the floor count on the rest. Only surplus regions count, so moves are not
/// counted twice.
pub fn moves_to_even_distribution(model: &ClusterModel, table: usize) -> usize {
    let min = model.min_regions_if_evenly_distributed(table);
    let max = model.max_regions_if_evenly_distributed(table);
    let mut max_servers_remaining = model.num_servers_with_max_regions_if_evenly_distributed(table);
    let mut moves = 0;
    for server in 0..model.num_servers() {
        let count = model.num_regions_on_server_of_table(server, table);
        if count >= max && max_servers_remaining > 0 {
            moves += count - max;
            max_servers_remaining -= 1;
        } else if count > min {
            moves += count - min;
        }
    }
    moves
}

/// Skew in how evenly each table's regions spread across servers
///
/// Each table scores `moves_to_even / (regions - ceiling)`, the fraction of
/// the pathological move count. The total is a weighted mix of the worst
/// table and the average table, square-rooted to spread the typically small
/// values over `[0, 1]`.
pub struct TableSkewCost {
    multiplier: f32,
    max_skew_weight: f32,
    avg_skew_weight: f32,
    moves_per_table: Vec<usize>,
}

impl TableSkewCost {
    pub fn new(multiplier: f32, max_table_skew_weight: f32) -> Self {
        Self {
            multiplier,
            max_skew_weight: max_table_skew_weight,
            avg_skew_weight: 1.0 - max_table_skew_weight,
            moves_per_table: Vec::new(),
        }
    }

    fn skew_of(&self, model: &ClusterModel, table: usize) -> f64 {
        let pathological =
            model.regions_per_table[table] - model.max_regions_if_evenly_distributed(table);
        if pathological == 0 {
            0.0
        } else {
            self.moves_per_table[table] as f64 / pathological as f64
        }
    }
}

impl CostFunction for TableSkewCost {
    fn name(&self) -> &'static str {
        "table_skew"
    }

    fn multiplier(&self) -> f32 {
        self.multiplier
    }

    fn init(&mut self, model: &ClusterModel) {
        self.moves_per_table = (0..model.num_tables())
            .map(|table| moves_to_even_distribution(model, table))
            .collect();
    }

    fn region_moved(&mut self, model: &ClusterModel, region: usize, _from: usize, _to: usize) {
        let table = model.region_to_table[region];
        self.moves_per_table[table] = moves_to_even_distribution(model, table);
    }

    fn region_swapped(
        &mut self,
        model: &ClusterModel,
        region_a: usize,
        server_a: usize,
        region_b: usize,
        server_b: usize,
    ) {
        // a same-table swap leaves every per-table count unchanged
        if model.region_to_table[region_a] == model.region_to_table[region_b] {
            return;
        }
        self.region_moved(model, region_a, server_a, server_b);
        self.region_moved(model, region_b, server_b, server_a);
    }

    fn cost(&self, model: &ClusterModel) -> f64 {
        if model.num_tables() == 0 {
            return 0.0;
        }
        let mut max_skew: f64 = 0.0;
        let mut sum_skew = 0.0;
        for table in 0..model.num_tables() {
            let skew = self.skew_of(model, table);
            max_skew = max_skew.max(skew);
            sum_skew += skew;
        }
        let avg_skew = sum_skew / model.num_tables() as f64;
        (self.max_skew_weight as f64 * max_skew + self.avg_skew_weight as f64 * avg_skew).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{RegionInfo, ServerName, SingleRackResolver};
    use crate::model::Action;
    use std::collections::HashMap;

    /// Three servers; table "hot" entirely on the first server, table "flat"
    /// spread one per server.
    fn skewed_model() -> ClusterModel {
        let mut assignment = HashMap::new();
        assignment.insert(
            ServerName::new("a", 16020, 1),
            vec![
                RegionInfo::new("hot0", "hot"),
                RegionInfo::new("hot1", "hot"),
                RegionInfo::new("hot2", "hot"),
                RegionInfo::new("flat0", "flat"),
            ],
        );
        assignment.insert(
            ServerName::new("b", 16020, 1),
            vec![RegionInfo::new("flat1", "flat")],
        );
        assignment.insert(
            ServerName::new("c", 16020, 1),
            vec![RegionInfo::new("flat2", "flat")],
        );
        ClusterModel::build(&assignment, &HashMap::new(), None, &SingleRackResolver).unwrap()
    }

    #[test]
    fn test_moves_to_even_distribution() {
        let model = skewed_model();
        let hot = model
            .tables
            .iter()
            .position(|t| t.0 == "hot")
            .unwrap();
        let flat = model
            .tables
            .iter()
            .position(|t| t.0 == "flat")
            .unwrap();
        // 3 regions over 3 servers: one per server, two must leave the first
        assert_eq!(moves_to_even_distribution(&model, hot), 2);
        assert_eq!(moves_to_even_distribution(&model, flat), 0);
    }

    #[test]
    fn test_incremental_matches_recompute() {
        let mut model = skewed_model();
        let mut cost = TableSkewCost::new(35.0, 0.0);
        cost.init(&model);
        let action = Action::Move {
            region: model
                .regions
                .iter()
                .position(|r| r.id.as_bytes() == b"hot1")
                .unwrap(),
            from: 0,
            to: 1,
        };
        model.apply(&action);
        cost.post_action(&model, &action);

        let mut fresh = TableSkewCost::new(35.0, 0.0);
        fresh.init(&model);
        assert_eq!(cost.cost(&model), fresh.cost(&model));
    }

    #[test]
    fn test_fully_skewed_table_scores_one() {
        let model = skewed_model();
        let mut cost = TableSkewCost::new(35.0, 1.0);
        cost.init(&model);
        // worst table ("hot") is maximally skewed: sqrt(1.0)
        assert_eq!(cost.cost(&model), 1.0);
    }
}
