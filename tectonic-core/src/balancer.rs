//! Stochastic balancer driver
//!
//! The hill-climbing loop: build a cluster model, pick a candidate generator
//! uniformly at random each step, apply its action, keep it when the
//! weighted cost drops and undo it otherwise. On termination the difference
//! between the initial and final assignment becomes the movement plan.
//!
//! A balancer instance is long-lived and owns the rolling per-region load
//! history; one `balance` call is a single synchronous computation over a
//! model that never outlives it. Callers serialize `balance` against
//! `update_region_loads` themselves.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};

use crate::candidate::{
    CandidateGenerator, LoadSkewCandidateGenerator, LocalityCandidateGenerator,
    RandomCandidateGenerator, ReplicaColocationCandidateGenerator,
};
use crate::config::BalancerConfig;
use crate::cost::{
    build_cost_functions, compute_weighted_cost, CostFunction, ReplicaHostCost, ReplicaRackCost,
};
use crate::error::Result;
use crate::metrics::standard;
use crate::model::{
    ClusterModel, LocalityOracle, RackResolver, RegionId, RegionInfo, RegionLoad, RegionMove,
    ServerName, SingleRackResolver,
};

/// Minimum number of active servers required to attempt balancing
pub const MIN_SERVER_BALANCE: usize = 2;

/// One cost function's share of the final weighted total
#[derive(Debug, Clone)]
pub struct FunctionCost {
    pub name: &'static str,
    pub multiplier: f32,
    /// Weighted cost at the end of the run
    pub weighted_cost: f64,
    /// Share of the overall cost, 0 when the total is 0
    pub fraction: f64,
}

/// Outcome of a balance invocation that found an improvement
#[derive(Debug, Clone)]
pub struct BalancePlan {
    /// Region movements to apply; order carries no meaning
    pub moves: Vec<RegionMove>,
    pub cost_before: f64,
    pub cost_after: f64,
    /// Optimizer steps taken before termination
    pub steps: u64,
    pub elapsed: Duration,
    /// Per-function breakdown of the final cost
    pub function_costs: Vec<FunctionCost>,
}

/// Cluster balancer built around a stochastic cost search
pub struct StochasticBalancer {
    config: BalancerConfig,
    loads: HashMap<RegionId, VecDeque<RegionLoad>>,
    rng: StdRng,
    locality: Option<Box<dyn LocalityOracle>>,
    racks: Box<dyn RackResolver>,
}

impl StochasticBalancer {
    /// Create a balancer seeded from entropy
    pub fn new(config: BalancerConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a balancer with a fixed seed; identical snapshots then produce
    /// identical plans
    pub fn with_seed(config: BalancerConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: BalancerConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            loads: HashMap::new(),
            rng,
            locality: None,
            racks: Box::new(SingleRackResolver),
        })
    }

    /// Provide a block-locality source; without one the locality cost reads
    /// zero and the locality generator degrades to random moves
    pub fn set_locality_oracle(&mut self, oracle: Box<dyn LocalityOracle>) {
        self.locality = Some(oracle);
    }

    pub fn set_rack_resolver(&mut self, resolver: Box<dyn RackResolver>) {
        self.racks = resolver;
    }

    /// Fold a round of load reports into the rolling history
    ///
    /// The history map is replaced wholesale: regions missing from the
    /// reports are dropped, surviving regions keep their bounded sample
    /// window with the oldest sample evicted once the window is full.
    pub fn update_region_loads<I>(&mut self, reports: I)
    where
        I: IntoIterator<Item = (RegionId, RegionLoad)>,
    {
        let mut old = std::mem::take(&mut self.loads);
        for (region, sample) in reports {
            let mut window = old.remove(&region).unwrap_or_default();
            if window.len() >= self.config.num_region_loads_to_remember {
                window.pop_front();
            }
            window.push_back(sample);
            self.loads.insert(region, window);
        }
    }

    /// Compute a movement plan for the given assignment snapshot
    ///
    /// Returns `None` when the cluster is too small, already balanced, or no
    /// cheaper assignment was found within the step and time budget.
    pub fn balance(
        &mut self,
        assignment: &HashMap<ServerName, Vec<RegionInfo>>,
    ) -> Option<BalancePlan> {
        if assignment.len() <= 1 {
            debug!(servers = assignment.len(), "not balancing a cluster this small");
            return None;
        }

        let mut model = match ClusterModel::build(
            assignment,
            &self.loads,
            self.locality.as_deref(),
            self.racks.as_ref(),
        ) {
            Ok(model) => model,
            Err(e) => {
                error!(error = %e, "refusing to balance an inconsistent snapshot");
                return None;
            }
        };

        let start = Instant::now();
        let mut functions = build_cost_functions(&self.config);
        for function in functions.iter_mut() {
            function.init(&model);
        }

        if !self.needs_balance(&model, &functions) {
            standard::BALANCE_SKIPPED.inc();
            return None;
        }

        let mut scratch = vec![0.0; functions.len()];
        let mut current_cost = compute_weighted_cost(&functions, &model, f64::MAX, &mut scratch);
        let mut best_function_costs = scratch.clone();
        let initial_cost = current_cost;

        let max_steps = self.config.max_steps.min(
            model.num_regions() as u64 * self.config.steps_per_region * model.num_servers() as u64,
        );

        info!(
            initial_cost,
            max_steps,
            functions = %function_costs_line(&functions, &model),
            "starting stochastic balance"
        );

        let generators: [Box<dyn CandidateGenerator>; 4] = [
            Box::new(RandomCandidateGenerator),
            Box::new(LoadSkewCandidateGenerator),
            Box::new(LocalityCandidateGenerator),
            Box::new(ReplicaColocationCandidateGenerator),
        ];

        let mut steps_taken = 0u64;
        while steps_taken < max_steps {
            steps_taken += 1;
            let generator = &generators[self.rng.gen_range(0..generators.len())];
            let action = generator.generate(&model, &mut self.rng);
            if action.is_null() {
                continue;
            }

            model.apply(&action);
            for function in functions.iter_mut() {
                function.post_action(&model, &action);
            }

            let new_cost = compute_weighted_cost(&functions, &model, current_cost, &mut scratch);
            if new_cost < current_cost {
                current_cost = new_cost;
                best_function_costs.copy_from_slice(&scratch);
            } else {
                let undo = action.inverse();
                model.apply(&undo);
                for function in functions.iter_mut() {
                    function.post_action(&model, &undo);
                }
            }

            if start.elapsed() >= self.config.max_running_time {
                break;
            }
        }

        let elapsed = start.elapsed();
        standard::BALANCE_RUNS.inc();
        standard::BALANCE_DURATION.observe(elapsed.as_secs_f64());
        standard::LAST_STEP_COUNT.set(steps_taken as f64);
        standard::LAST_COST_BEFORE.set(initial_cost);
        standard::LAST_COST_AFTER.set(current_cost);

        if current_cost < initial_cost {
            let moves = extract_plan(&model);
            standard::PLAN_MOVES.inc_by(moves.len() as u64);
            let function_costs = functions
                .iter()
                .zip(best_function_costs.iter())
                .map(|(function, &weighted_cost)| FunctionCost {
                    name: function.name(),
                    multiplier: function.multiplier(),
                    weighted_cost,
                    fraction: if current_cost > 0.0 {
                        weighted_cost / current_cost
                    } else {
                        0.0
                    },
                })
                .collect();
            info!(
                moves = moves.len(),
                steps = steps_taken,
                elapsed_ms = elapsed.as_millis() as u64,
                cost_before = initial_cost,
                cost_after = current_cost,
                "balance plan computed"
            );
            Some(BalancePlan {
                moves,
                cost_before: initial_cost,
                cost_after: current_cost,
                steps: steps_taken,
                elapsed,
                function_costs,
            })
        } else {
            debug!(
                steps = steps_taken,
                elapsed_ms = elapsed.as_millis() as u64,
                initial_cost,
                "no plan beats the current placement"
            );
            None
        }
    }

    /// Pre-check: colocated replicas always warrant a run; otherwise the
    /// normalized total cost has to clear the configured threshold
    fn needs_balance(&self, model: &ClusterModel, functions: &[Box<dyn CostFunction>]) -> bool {
        if self.replicas_colocated(model) {
            return true;
        }

        let mut total = 0.0;
        let mut sum_multiplier = 0.0f32;
        for function in functions {
            let multiplier = function.multiplier();
            if multiplier <= 0.0 {
                continue;
            }
            if !function.is_needed(model) {
                debug!(
                    function = function.name(),
                    "cost function not needed for this cluster"
                );
                continue;
            }
            sum_multiplier += multiplier;
            total += function.cost(model) * multiplier as f64;
        }

        if total <= 0.0
            || sum_multiplier <= 0.0
            || total / (sum_multiplier as f64) < self.config.min_cost_need_balance as f64
        {
            info!(
                total,
                sum_multiplier,
                min_cost_need_balance = self.config.min_cost_need_balance,
                "skipping balance of an already balanced cluster"
            );
            return false;
        }

        if model.num_servers() < MIN_SERVER_BALANCE {
            debug!(
                servers = model.num_servers(),
                "not enough active servers to balance"
            );
            return false;
        }

        true
    }

    fn replicas_colocated(&self, model: &ClusterModel) -> bool {
        let mut host = ReplicaHostCost::new(self.config.multipliers.region_replica_host);
        host.init(model);
        if host.cost(model) > 0.0 {
            return true;
        }
        let mut rack = ReplicaRackCost::new(self.config.multipliers.region_replica_rack);
        rack.init(model);
        rack.cost(model) > 0.0
    }
}

/// Diff the final model against its construction snapshot
fn extract_plan(model: &ClusterModel) -> Vec<RegionMove> {
    let mut moves = Vec::new();
    for region in 0..model.num_regions() {
        let initial = model.initial_region_to_server[region];
        let current = model.region_to_server[region];
        if initial != current {
            moves.push(RegionMove {
                region: model.regions[region].id.clone(),
                from: model.servers[initial].clone(),
                to: model.servers[current].clone(),
            });
        }
    }
    moves
}

fn function_costs_line(functions: &[Box<dyn CostFunction>], model: &ClusterModel) -> String {
    let mut line = String::new();
    for function in functions {
        line.push_str(&format!(
            "{}:({}, {:.4}); ",
            function.name(),
            function.multiplier(),
            function.cost(model)
        ));
    }
    line
}
