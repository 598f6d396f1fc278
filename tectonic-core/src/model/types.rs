//! Identity and load types for the cluster model
//!
//! Regions are identified by opaque byte strings, servers by
//! host:port:startcode. These are the types callers hand to the balancer and
//! get back in plans.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of a region (a contiguous key range)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(Bytes);

impl RegionId {
    /// Create an id from raw bytes
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes of the id
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionId({})", self.0.escape_ascii())
    }
}

/// A server process, identified by host, port, and start code
///
/// Multiple servers may run on one host; the start code distinguishes
/// restarts of the same host:port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerName {
    pub host: String,
    pub port: u16,
    pub start_code: u64,
}

impl ServerName {
    pub fn new(host: impl Into<String>, port: u16, start_code: u64) -> Self {
        Self {
            host: host.into(),
            port,
            start_code,
        }
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.host, self.port, self.start_code)
    }
}

/// Name of a table grouping regions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName(pub String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A region as known to the balancer: identity, owning table, and replica
/// role
///
/// `primary == id` marks a primary replica; secondary replicas carry the id
/// of their primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionInfo {
    pub id: RegionId,
    pub table: TableName,
    pub primary: RegionId,
}

impl RegionInfo {
    /// Create a primary region
    pub fn new(id: impl Into<RegionId>, table: impl Into<TableName>) -> Self {
        let id = id.into();
        Self {
            primary: id.clone(),
            id,
            table: table.into(),
        }
    }

    /// Mark this region as a secondary replica of `primary`
    pub fn with_primary(mut self, primary: impl Into<RegionId>) -> Self {
        self.primary = primary.into();
        self
    }

    pub fn is_primary(&self) -> bool {
        self.id == self.primary
    }
}

impl From<&str> for TableName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One observed load sample for a region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLoad {
    /// Cumulative read request counter
    pub read_requests: u64,
    /// Cumulative write request counter
    pub write_requests: u64,
    /// Current memstore size in MB
    pub memstore_size_mb: u32,
    /// Current store file size in MB
    pub storefile_size_mb: u32,
}

/// One element of a balance plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionMove {
    pub region: RegionId,
    pub from: ServerName,
    pub to: ServerName,
}

/// Source of block-locality information, typically backed by the storage
/// layer's block reports
///
/// Returns `(server, fraction)` pairs ranked by descending locality. An empty
/// list means the region's block placement is unknown.
pub trait LocalityOracle {
    fn region_locality(&self, region: &RegionId) -> Vec<(ServerName, f32)>;
}

/// Maps a server to the rack (fault domain) it lives in
pub trait RackResolver {
    fn rack(&self, server: &ServerName) -> String;
}

/// Rack resolver for clusters without rack topology: everything lives in one
/// default rack
#[derive(Debug, Default)]
pub struct SingleRackResolver;

impl RackResolver for SingleRackResolver {
    fn rack(&self, _server: &ServerName) -> String {
        "default-rack".to_string()
    }
}
