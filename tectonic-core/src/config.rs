//! Balancer configuration
//!
//! Every tunable of the optimizer, with production defaults. Callers that
//! load configuration from files can deserialize straight into these structs;
//! unset keys fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TectonicError};

/// Weights for the individual cost functions
///
/// A weight of zero or less disables the function entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostMultipliers {
    /// Skew in total region count per server
    pub region_count_skew: f32,
    /// Skew in primary-replica count per server
    pub primary_region_count_skew: f32,
    /// Penalty per region moved away from its starting server
    pub move_cost: f32,
    /// Data-locality loss of the current placement
    pub locality: f32,
    /// Per-table placement skew
    pub table_skew: f32,
    /// Replicas of one region sharing a host
    pub region_replica_host: f32,
    /// Replicas of one region sharing a rack
    pub region_replica_rack: f32,
    /// Read request rate skew per server
    pub read_request: f32,
    /// Write request rate skew per server
    pub write_request: f32,
    /// Memstore growth rate skew per server
    pub memstore_size: f32,
    /// Store file size skew per server
    pub storefile_size: f32,
}

impl Default for CostMultipliers {
    fn default() -> Self {
        Self {
            region_count_skew: 500.0,
            primary_region_count_skew: 500.0,
            move_cost: 7.0,
            locality: 25.0,
            table_skew: 35.0,
            region_replica_host: 100_000.0,
            region_replica_rack: 10_000.0,
            read_request: 5.0,
            write_request: 5.0,
            memstore_size: 5.0,
            storefile_size: 5.0,
        }
    }
}

/// Configuration for one balancer instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Hard cap on optimizer steps per invocation
    pub max_steps: u64,
    /// Step budget coefficient; the effective budget is
    /// `min(max_steps, regions * steps_per_region * servers)`
    pub steps_per_region: u64,
    /// Wall-clock deadline for one invocation
    pub max_running_time: Duration,
    /// Rolling load samples remembered per region
    pub num_region_loads_to_remember: usize,
    /// Normalized total cost below which the cluster counts as balanced
    pub min_cost_need_balance: f32,
    /// Fraction of all regions one plan may move before the move cost
    /// saturates
    pub max_move_percent: f32,
    /// Proportion of the most skewed table (vs. the average across tables)
    /// in the table-skew cost, between 0 and 1
    pub max_table_skew_weight: f32,
    /// Cost function weights
    pub multipliers: CostMultipliers,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            steps_per_region: 800,
            max_running_time: Duration::from_millis(30_000),
            num_region_loads_to_remember: 15,
            min_cost_need_balance: 0.05,
            max_move_percent: 0.25,
            max_table_skew_weight: 0.0,
            multipliers: CostMultipliers::default(),
        }
    }
}

impl BalancerConfig {
    /// Check value ranges; called once when the balancer is constructed
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_table_skew_weight) {
            return Err(TectonicError::InvalidConfig {
                key: "max_table_skew_weight",
                reason: format!("{} is not within [0, 1]", self.max_table_skew_weight),
            });
        }
        if !(0.0..=1.0).contains(&self.max_move_percent) {
            return Err(TectonicError::InvalidConfig {
                key: "max_move_percent",
                reason: format!("{} is not within [0, 1]", self.max_move_percent),
            });
        }
        if self.steps_per_region == 0 {
            return Err(TectonicError::InvalidConfig {
                key: "steps_per_region",
                reason: "must be positive".into(),
            });
        }
        if self.num_region_loads_to_remember == 0 {
            return Err(TectonicError::InvalidConfig {
                key: "num_region_loads_to_remember",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}
