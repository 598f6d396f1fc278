//! Cluster model: assignment snapshot, identities, and invertible actions

pub mod action;
pub mod cluster;
pub mod types;

pub use action::Action;
pub use cluster::ClusterModel;
pub use types::{
    LocalityOracle, RackResolver, RegionId, RegionInfo, RegionLoad, RegionMove, ServerName,
    SingleRackResolver, TableName,
};
