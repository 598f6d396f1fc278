//! Error types for the balancer core
//!
//! Covers configuration validation and cluster-snapshot assembly. Invalid
//! actions inside the search loop are programming errors and assert instead
//! of returning an error.

use thiserror::Error;

use crate::model::RegionId;

/// Primary error type for balancer operations
#[derive(Debug, Error)]
pub enum TectonicError {
    /// A configuration value is out of range
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    /// The cluster snapshot contained no servers
    #[error("cluster snapshot contains no servers")]
    EmptyAssignment,

    /// A region appeared under more than one server in the snapshot
    #[error("region {region} is listed under more than one server")]
    DuplicateRegion { region: RegionId },
}

impl TectonicError {
    /// Returns true if this error comes from the caller-supplied snapshot
    /// rather than from configuration
    pub fn is_snapshot_error(&self) -> bool {
        matches!(
            self,
            TectonicError::EmptyAssignment | TectonicError::DuplicateRegion { .. }
        )
    }
}

/// Result type alias for balancer operations
pub type Result<T> = std::result::Result<T, TectonicError>;
