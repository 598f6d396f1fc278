//! Tectonic Core - cluster balancer for range-partitioned storage
//!
//! Given a snapshot of region placement and rolling per-region load
//! statistics, this crate proposes a set of region movements that lowers the
//! cluster's overall imbalance. The optimizer is a stochastic hill climb
//! over an in-memory cluster model:
//! - the model supports constant-time mutation and constant-time reads of
//!   derived quantities
//! - a set of weighted cost functions scores every candidate state
//! - candidate generators propose small mutations (move / swap)
//! - the search keeps mutations that lower the weighted cost and undoes the
//!   rest
//!
//! Plans are best effort, never worse than the starting assignment. Plan
//! application, metrics shipping, and discovery of block locality are the
//! caller's concern.

pub mod balancer;
pub mod candidate;
pub mod config;
pub mod cost;
pub mod error;
pub mod metrics;
pub mod model;

pub use balancer::{BalancePlan, FunctionCost, StochasticBalancer, MIN_SERVER_BALANCE};
pub use config::{BalancerConfig, CostMultipliers};
pub use error::TectonicError;
pub use model::{
    LocalityOracle, RackResolver, RegionId, RegionInfo, RegionLoad, RegionMove, ServerName,
    SingleRackResolver, TableName,
};
