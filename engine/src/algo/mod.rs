//! Shortest path algorithms and the traffic assignment built on them.

use crate::datastr::graph::*;

pub mod customizable_contraction_hierarchy;
pub mod dijkstra;
pub mod traffic_assignment;

/// A one-to-one shortest path query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Query {
    pub from: NodeId,
    pub to: NodeId,
}
