//! Reading road networks and OD-pairs from CSV files.
//!
//! Both formats have a header row and name their columns, additional columns are ignored.
//! Lines starting with `#` are comments.

use crate::{
    algo::traffic_assignment::OdPair,
    cli::CliErr,
    datastr::graph::*,
    util::InRangeOption,
};
use csv::{ReaderBuilder, Trim};
use log::info;
use serde::Deserialize;
use std::{error::Error, fs::File, io::Read, path::Path};

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    edge_tail: NodeId,
    edge_head: NodeId,
    /// in meters
    length: f64,
    /// in vehicles per hour, zero marks a demand edge
    capacity: f64,
    /// in km/h
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OdRecord {
    origin: NodeId,
    destination: NodeId,
    #[serde(default = "unit_volume")]
    volume: f64,
    #[serde(default)]
    rebalancer: Option<NodeId>,
    #[serde(default)]
    edge1: Option<EdgeId>,
    #[serde(default)]
    edge2: Option<EdgeId>,
}

fn unit_volume() -> f64 {
    1.0
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    ReaderBuilder::new().comment(Some(b'#')).trim(Trim::All).from_reader(source)
}

/// Read a road network. The number of nodes is one more than the largest node id.
pub fn read_network<P: AsRef<Path>>(path: P) -> Result<RoadNetwork, Box<dyn Error>> {
    let network = read_network_from(File::open(path.as_ref())?)?;
    info!("read network {:?} with {} nodes and {} edges", path.as_ref(), network.num_nodes(), network.num_edges());
    Ok(network)
}

pub fn read_network_from<R: Read>(source: R) -> Result<RoadNetwork, Box<dyn Error>> {
    let mut edges = Vec::new();
    let mut num_nodes = 0;

    for (line, record) in reader(source).deserialize().enumerate() {
        let record: EdgeRecord = record?;
        // the header is the first line
        let line = line + 2;
        if !(record.capacity >= 0.0) {
            return Err(CliErr::from(format!("negative capacity in line {}", line)).into());
        }
        if record.capacity > 0.0 && !(record.length > 0.0 && record.speed > 0.0) {
            return Err(CliErr::from(format!("road edge without positive length and speed in line {}", line)).into());
        }
        if !(record.length.is_finite() && record.speed.is_finite() && record.capacity.is_finite()) {
            return Err(CliErr::from(format!("non finite edge attribute in line {}", line)).into());
        }
        if record.edge_tail == NodeId::MAX || record.edge_head == NodeId::MAX {
            return Err(CliErr::from(format!("node id out of range in line {}", line)).into());
        }

        num_nodes = num_nodes.max(record.edge_tail.max(record.edge_head) as usize + 1);
        edges.push(EdgeAttributes {
            tail: record.edge_tail,
            head: record.edge_head,
            length: record.length,
            capacity: record.capacity,
            speed: record.speed,
        });
    }

    if edges.is_empty() {
        return Err(CliErr::from("network without edges").into());
    }
    if edges.len() >= EdgeId::MAX as usize {
        return Err(CliErr::from("too many edges").into());
    }

    Ok(RoadNetwork::new(num_nodes, &edges))
}

/// Read OD-pairs and check them against a network with `num_nodes` nodes and `num_edges` edges.
pub fn read_od_pairs<P: AsRef<Path>>(path: P, num_nodes: usize, num_edges: usize) -> Result<Vec<OdPair>, Box<dyn Error>> {
    let od_pairs = read_od_pairs_from(File::open(path.as_ref())?, num_nodes, num_edges)?;
    info!("read {} OD-pairs from {:?}", od_pairs.len(), path.as_ref());
    Ok(od_pairs)
}

pub fn read_od_pairs_from<R: Read>(source: R, num_nodes: usize, num_edges: usize) -> Result<Vec<OdPair>, Box<dyn Error>> {
    let mut od_pairs = Vec::new();

    for (line, record) in reader(source).deserialize().enumerate() {
        let record: OdRecord = record?;
        let line = line + 2;
        let node_in_range = |node: NodeId| (node as usize) < num_nodes;
        let edge_in_range = |edge: Option<EdgeId>| edge.map_or(true, |edge| (edge as usize) < num_edges);

        if !node_in_range(record.origin) || !node_in_range(record.destination) || !record.rebalancer.map_or(true, node_in_range) {
            return Err(CliErr::from(format!("OD-pair in line {} references a node outside of the network", line)).into());
        }
        if !edge_in_range(record.edge1) || !edge_in_range(record.edge2) {
            return Err(CliErr::from(format!("OD-pair in line {} references an edge outside of the network", line)).into());
        }
        if !(record.volume >= 0.0 && record.volume.is_finite()) {
            return Err(CliErr::from(format!("invalid volume in line {}", line)).into());
        }

        od_pairs.push(OdPair {
            origin: record.origin,
            destination: record.destination,
            volume: record.volume,
            rebalancer: InRangeOption::new(record.rebalancer),
            edge1: InRangeOption::new(record.edge1),
            edge2: InRangeOption::new(record.edge2),
        });
    }

    Ok(od_pairs)
}
