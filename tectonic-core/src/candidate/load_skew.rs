//! Load-skew-driven generator

use rand::rngs::StdRng;

use crate::candidate::{pick_random_regions, CandidateGenerator};
use crate::model::{Action, ClusterModel};

/// Targets the heaviest and lightest servers directly instead of sampling,
/// so badly skewed clusters improve quickly
pub struct LoadSkewCandidateGenerator;

impl CandidateGenerator for LoadSkewCandidateGenerator {
    fn name(&self) -> &'static str {
        "load_skew"
    }

    fn generate(&self, model: &ClusterModel, rng: &mut StdRng) -> Action {
        let sorted = model.sorted_servers_by_region_count();
        let Some(&most_loaded) = sorted.last() else {
            return Action::Null;
        };
        let Some(least_loaded) = sorted.iter().copied().find(|&s| s != most_loaded) else {
            return Action::Null;
        };
        pick_random_regions(model, rng, most_loaded, least_loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{RegionInfo, ServerName, SingleRackResolver};
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_moves_flow_off_the_heaviest_server() {
        let mut assignment = HashMap::new();
        assignment.insert(
            ServerName::new("a", 16020, 1),
            (0..8)
                .map(|i| RegionInfo::new(format!("r{i}").as_str(), "t"))
                .collect(),
        );
        assignment.insert(ServerName::new("b", 16020, 1), vec![]);
        assignment.insert(ServerName::new("c", 16020, 1), vec![RegionInfo::new("x", "t")]);
        let model =
            ClusterModel::build(&assignment, &HashMap::new(), None, &SingleRackResolver).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let generator = LoadSkewCandidateGenerator;
        let mut saw_move = false;
        for _ in 0..50 {
            if let Action::Move { from, to, .. } = generator.generate(&model, &mut rng) {
                // server a is index 0 and the heaviest, b is empty
                assert_eq!(from, 0);
                assert_eq!(to, 1);
                saw_move = true;
            }
        }
        assert!(saw_move);
    }
}
