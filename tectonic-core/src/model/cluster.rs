//! In-memory cluster model
//!
//! A mutable snapshot of the region assignment with every derived index the
//! optimizer reads, kept in lockstep under constant-time mutations. The model
//! is built at the start of one balance invocation, mutated only by the
//! search loop, and discarded at the end.
//!
//! Regions, servers, hosts, racks, and tables are addressed by dense indices.
//! The per-group region and primary lists stay sorted; sortedness is what
//! lets the replica cost functions detect co-located replicas as runs of
//! equal values without hashing.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::error::{Result, TectonicError};
use crate::model::action::Action;
use crate::model::types::{
    LocalityOracle, RackResolver, RegionId, RegionInfo, RegionLoad, ServerName, TableName,
};

/// Mutable assignment snapshot with incrementally maintained indices
#[derive(Clone)]
pub struct ClusterModel {
    pub servers: Vec<ServerName>,
    pub regions: Vec<RegionInfo>,
    pub tables: Vec<TableName>,
    pub hosts: Vec<String>,
    pub racks: Vec<String>,

    /// Current server of each region
    pub region_to_server: Vec<usize>,
    /// Server of each region when the model was built; never mutated
    pub initial_region_to_server: Vec<usize>,
    pub region_to_table: Vec<usize>,
    /// Index of each region's primary replica (its own index for primaries)
    pub region_to_primary: Vec<usize>,

    /// Region indices per server, sorted ascending
    pub regions_per_server: Vec<Vec<usize>>,
    pub regions_per_host: Vec<Vec<usize>>,
    pub regions_per_rack: Vec<Vec<usize>>,

    /// Primary indices of the regions in each group, sorted ascending.
    /// Duplicates mean co-located replicas.
    pub primaries_of_regions_per_server: Vec<Vec<usize>>,
    pub primaries_of_regions_per_host: Vec<Vec<usize>>,
    pub primaries_of_regions_per_rack: Vec<Vec<usize>>,

    pub server_to_host: Vec<usize>,
    pub server_to_rack: Vec<usize>,
    pub servers_per_host: Vec<Vec<usize>>,
    pub servers_per_rack: Vec<Vec<usize>>,

    pub regions_per_table: Vec<usize>,
    pub region_count_per_server_per_table: Vec<Vec<usize>>,

    /// Server indices ranked by descending block locality per region; empty
    /// when block placement is unknown
    pub region_locations: Vec<Vec<usize>>,
    /// Locality fractions parallel to `region_locations`
    region_localities: Vec<Vec<f32>>,

    /// Rolling load samples per region, oldest first
    pub region_loads: Vec<Vec<RegionLoad>>,

    /// Regions whose current server differs from the initial snapshot
    pub num_moved_regions: usize,
    pub has_replicas: bool,
    pub multi_servers_per_host: bool,
    pub has_locality_data: bool,

    sorted_servers: RefCell<Option<Vec<usize>>>,
}

impl ClusterModel {
    /// Build a model from an assignment snapshot
    ///
    /// Servers are indexed in sorted name order so identical snapshots
    /// produce identical models. The locality oracle is consulted once per
    /// region; results are held for the model's lifetime.
    pub fn build(
        assignment: &HashMap<ServerName, Vec<RegionInfo>>,
        loads: &HashMap<RegionId, VecDeque<RegionLoad>>,
        locality: Option<&dyn LocalityOracle>,
        racks: &dyn RackResolver,
    ) -> Result<ClusterModel> {
        if assignment.is_empty() {
            return Err(TectonicError::EmptyAssignment);
        }

        let mut servers: Vec<ServerName> = assignment.keys().cloned().collect();
        servers.sort();
        let num_servers = servers.len();

        let mut hosts: Vec<String> = Vec::new();
        let mut host_index: HashMap<String, usize> = HashMap::new();
        let mut rack_names: Vec<String> = Vec::new();
        let mut rack_index: HashMap<String, usize> = HashMap::new();
        let mut server_to_host = Vec::with_capacity(num_servers);
        let mut server_to_rack = Vec::with_capacity(num_servers);
        for server in &servers {
            let host = *host_index.entry(server.host.clone()).or_insert_with(|| {
                hosts.push(server.host.clone());
                hosts.len() - 1
            });
            server_to_host.push(host);
            let rack_name = racks.rack(server);
            let rack = *rack_index.entry(rack_name.clone()).or_insert_with(|| {
                rack_names.push(rack_name);
                rack_names.len() - 1
            });
            server_to_rack.push(rack);
        }
        let num_hosts = hosts.len();
        let num_racks = rack_names.len();

        let mut servers_per_host = vec![Vec::new(); num_hosts];
        let mut servers_per_rack = vec![Vec::new(); num_racks];
        for s in 0..num_servers {
            servers_per_host[server_to_host[s]].push(s);
            servers_per_rack[server_to_rack[s]].push(s);
        }

        let mut regions: Vec<RegionInfo> = Vec::new();
        let mut region_index: HashMap<RegionId, usize> = HashMap::new();
        let mut region_to_server: Vec<usize> = Vec::new();
        for (s, server) in servers.iter().enumerate() {
            for info in &assignment[server] {
                if region_index.contains_key(&info.id) {
                    return Err(TectonicError::DuplicateRegion {
                        region: info.id.clone(),
                    });
                }
                region_index.insert(info.id.clone(), regions.len());
                regions.push(info.clone());
                region_to_server.push(s);
            }
        }
        let num_regions = regions.len();

        let mut tables: Vec<TableName> = Vec::new();
        let mut table_index: HashMap<TableName, usize> = HashMap::new();
        let mut region_to_table = Vec::with_capacity(num_regions);
        for info in &regions {
            let t = *table_index.entry(info.table.clone()).or_insert_with(|| {
                tables.push(info.table.clone());
                tables.len() - 1
            });
            region_to_table.push(t);
        }
        let num_tables = tables.len();
        let mut regions_per_table = vec![0usize; num_tables];
        for &t in &region_to_table {
            regions_per_table[t] += 1;
        }

        // Secondaries whose primary is missing from the snapshot degrade to
        // self-primary.
        let mut region_to_primary = Vec::with_capacity(num_regions);
        for (r, info) in regions.iter().enumerate() {
            match region_index.get(&info.primary) {
                Some(&p) => region_to_primary.push(p),
                None => {
                    debug!(
                        region = %info.id,
                        primary = %info.primary,
                        "primary replica not in snapshot, treating region as its own primary"
                    );
                    region_to_primary.push(r);
                }
            }
        }
        let has_replicas = region_to_primary.iter().enumerate().any(|(r, &p)| p != r);

        let mut regions_per_server = vec![Vec::new(); num_servers];
        for (r, &s) in region_to_server.iter().enumerate() {
            regions_per_server[s].push(r);
        }
        let mut regions_per_host = vec![Vec::new(); num_hosts];
        let mut regions_per_rack = vec![Vec::new(); num_racks];
        for (s, server_regions) in regions_per_server.iter().enumerate() {
            regions_per_host[server_to_host[s]].extend_from_slice(server_regions);
            regions_per_rack[server_to_rack[s]].extend_from_slice(server_regions);
        }
        for group in regions_per_host.iter_mut().chain(regions_per_rack.iter_mut()) {
            group.sort_unstable();
        }

        let primaries_of = |groups: &[Vec<usize>]| -> Vec<Vec<usize>> {
            groups
                .iter()
                .map(|group| {
                    let mut primaries: Vec<usize> =
                        group.iter().map(|&r| region_to_primary[r]).collect();
                    primaries.sort_unstable();
                    primaries
                })
                .collect()
        };
        let primaries_of_regions_per_server = primaries_of(&regions_per_server);
        let primaries_of_regions_per_host = primaries_of(&regions_per_host);
        let primaries_of_regions_per_rack = primaries_of(&regions_per_rack);

        let mut region_count_per_server_per_table = vec![vec![0usize; num_tables]; num_servers];
        for (r, &s) in region_to_server.iter().enumerate() {
            region_count_per_server_per_table[s][region_to_table[r]] += 1;
        }

        let server_by_name: HashMap<&ServerName, usize> =
            servers.iter().enumerate().map(|(s, name)| (name, s)).collect();
        let mut region_locations = vec![Vec::new(); num_regions];
        let mut region_localities = vec![Vec::new(); num_regions];
        if let Some(oracle) = locality {
            for (r, info) in regions.iter().enumerate() {
                for (server, fraction) in oracle.region_locality(&info.id) {
                    if let Some(&s) = server_by_name.get(&server) {
                        region_locations[r].push(s);
                        region_localities[r].push(fraction);
                    }
                }
            }
        }
        let has_locality_data = region_locations.iter().any(|l| !l.is_empty());

        let region_loads = regions
            .iter()
            .map(|info| {
                loads
                    .get(&info.id)
                    .map(|samples| samples.iter().copied().collect())
                    .unwrap_or_default()
            })
            .collect();

        let multi_servers_per_host = servers_per_host.iter().any(|s| s.len() > 1);

        debug!(
            num_servers,
            num_hosts, num_racks, num_regions, num_tables, "built cluster model"
        );

        Ok(ClusterModel {
            servers,
            regions,
            tables,
            hosts,
            racks: rack_names,
            initial_region_to_server: region_to_server.clone(),
            region_to_server,
            region_to_table,
            region_to_primary,
            regions_per_server,
            regions_per_host,
            regions_per_rack,
            primaries_of_regions_per_server,
            primaries_of_regions_per_host,
            primaries_of_regions_per_rack,
            server_to_host,
            server_to_rack,
            servers_per_host,
            servers_per_rack,
            regions_per_table,
            region_count_per_server_per_table,
            region_locations,
            region_localities,
            region_loads,
            num_moved_regions: 0,
            has_replicas,
            multi_servers_per_host,
            has_locality_data,
            sorted_servers: RefCell::new(None),
        })
    }

    pub fn num_servers(&self) -> usize {
        self.servers.len()
    }

    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    pub fn num_racks(&self) -> usize {
        self.racks.len()
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn num_regions_on_server(&self, server: usize) -> usize {
        self.regions_per_server[server].len()
    }

    pub fn num_regions_on_server_of_table(&self, server: usize, table: usize) -> usize {
        self.region_count_per_server_per_table[server][table]
    }

    pub fn mean_regions_per_server(&self) -> f64 {
        self.num_regions() as f64 / self.num_servers() as f64
    }

    /// Fraction of the region's data blocks local to the given server, 0
    /// when unknown
    pub fn locality_of_region(&self, region: usize, server: usize) -> f32 {
        self.region_locations[region]
            .iter()
            .position(|&s| s == server)
            .map(|at| self.region_localities[region][at])
            .unwrap_or(0.0)
    }

    /// Walk the region's locations in rank order and return the first server
    /// below the mean region count, skipping `excluding`
    pub fn least_loaded_server_with_locality_for(
        &self,
        region: usize,
        excluding: usize,
    ) -> Option<usize> {
        let mean = self.mean_regions_per_server();
        self.region_locations[region]
            .iter()
            .copied()
            .find(|&s| s != excluding && (self.regions_per_server[s].len() as f64) < mean)
    }

    /// The region on this server with the lowest data locality
    pub fn lowest_locality_region_on(&self, server: usize) -> Option<usize> {
        let mut lowest: Option<(usize, f32)> = None;
        for &r in &self.regions_per_server[server] {
            let locality = self.locality_of_region(r, server);
            match lowest {
                Some((_, best)) if locality >= best => {}
                _ => lowest = Some((r, locality)),
            }
        }
        lowest.map(|(r, _)| r)
    }

    /// Per-table floor of regions per server in an even distribution
    pub fn min_regions_if_evenly_distributed(&self, table: usize) -> usize {
        self.regions_per_table[table] / self.num_servers()
    }

    /// Per-table ceiling of regions per server in an even distribution
    pub fn max_regions_if_evenly_distributed(&self, table: usize) -> usize {
        let min = self.min_regions_if_evenly_distributed(table);
        if self.regions_per_table[table] % self.num_servers() == 0 {
            min
        } else {
            min + 1
        }
    }

    /// How many servers carry the ceiling count in an even distribution
    pub fn num_servers_with_max_regions_if_evenly_distributed(&self, table: usize) -> usize {
        let remainder = self.regions_per_table[table] % self.num_servers();
        if remainder == 0 {
            self.num_servers()
        } else {
            remainder
        }
    }

    /// Server indices sorted by ascending region count. Computed lazily and
    /// invalidated by every apply.
    pub fn sorted_servers_by_region_count(&self) -> Vec<usize> {
        let mut cache = self.sorted_servers.borrow_mut();
        cache
            .get_or_insert_with(|| {
                let mut sorted: Vec<usize> = (0..self.servers.len()).collect();
                sorted.sort_by_key(|&s| self.regions_per_server[s].len());
                sorted
            })
            .clone()
    }

    /// Apply an action, updating every index
    ///
    /// Preconditions (the region really is on the claimed server) are
    /// asserted: generators only derive actions from current state, so a
    /// violation is a programming error.
    pub fn apply(&mut self, action: &Action) {
        match *action {
            Action::Null => return,
            Action::Assign { region, server } => {
                let from = self.region_to_server[region];
                self.relocate(region, from, server);
            }
            Action::Move { region, from, to } => {
                assert_eq!(
                    self.region_to_server[region], from,
                    "move source mismatch for region {region}"
                );
                self.relocate(region, from, to);
            }
            Action::Swap {
                region_a,
                server_a,
                region_b,
                server_b,
            } => {
                assert_eq!(
                    self.region_to_server[region_a], server_a,
                    "swap source mismatch for region {region_a}"
                );
                assert_eq!(
                    self.region_to_server[region_b], server_b,
                    "swap source mismatch for region {region_b}"
                );
                self.relocate(region_a, server_a, server_b);
                self.relocate(region_b, server_b, server_a);
            }
        }
        *self.sorted_servers.borrow_mut() = None;
    }

    fn relocate(&mut self, region: usize, from: usize, to: usize) {
        if from == to {
            return;
        }
        self.region_to_server[region] = to;
        remove_sorted(&mut self.regions_per_server[from], region);
        insert_sorted(&mut self.regions_per_server[to], region);

        let primary = self.region_to_primary[region];
        remove_sorted(&mut self.primaries_of_regions_per_server[from], primary);
        insert_sorted(&mut self.primaries_of_regions_per_server[to], primary);

        let from_host = self.server_to_host[from];
        let to_host = self.server_to_host[to];
        if from_host != to_host {
            remove_sorted(&mut self.regions_per_host[from_host], region);
            insert_sorted(&mut self.regions_per_host[to_host], region);
            remove_sorted(&mut self.primaries_of_regions_per_host[from_host], primary);
            insert_sorted(&mut self.primaries_of_regions_per_host[to_host], primary);
        }

        let from_rack = self.server_to_rack[from];
        let to_rack = self.server_to_rack[to];
        if from_rack != to_rack {
            remove_sorted(&mut self.regions_per_rack[from_rack], region);
            insert_sorted(&mut self.regions_per_rack[to_rack], region);
            remove_sorted(&mut self.primaries_of_regions_per_rack[from_rack], primary);
            insert_sorted(&mut self.primaries_of_regions_per_rack[to_rack], primary);
        }

        let table = self.region_to_table[region];
        self.region_count_per_server_per_table[from][table] -= 1;
        self.region_count_per_server_per_table[to][table] += 1;

        let initial = self.initial_region_to_server[region];
        if from == initial && to != initial {
            self.num_moved_regions += 1;
        } else if from != initial && to == initial {
            self.num_moved_regions -= 1;
        }
    }
}

fn insert_sorted(values: &mut Vec<usize>, value: usize) {
    let at = values.partition_point(|&v| v < value);
    values.insert(at, value);
}

fn remove_sorted(values: &mut Vec<usize>, value: usize) {
    match values.binary_search(&value) {
        Ok(at) => {
            values.remove(at);
        }
        Err(_) => panic!("value {value} missing from sorted index"),
    }
}
