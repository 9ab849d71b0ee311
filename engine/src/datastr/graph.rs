//! Graph types and the traits the search algorithms are generic over.

use std::ops::Range;

pub mod first_out_graph;
pub mod road_network;

pub use self::first_out_graph::{ReversedGraphWithEdgeIds, UnweightedFirstOutGraph, UnweightedOwnedGraph};
pub use self::road_network::{EdgeAttributes, RoadNetwork};

/// Node ids are 32bit unsigned ints
pub type NodeId = u32;
/// Edge ids are 32bit unsigned ints
pub type EdgeId = u32;
/// Search weights are fixed point travel costs in 64bit unsigned ints.
pub type Weight = u64;
/// Set to `u64::MAX / 2` so that `INFINITY + x` for `x <= INFINITY` does not overflow.
pub const INFINITY: Weight = u64::MAX / 2;

/// Newtype for node ids so links can be told apart by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIdT(pub NodeId);

/// Newtype for edge ids so links can be told apart by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeIdT(pub EdgeId);

/// Base trait for graphs.
pub trait Graph {
    fn num_nodes(&self) -> usize;
    fn num_arcs(&self) -> usize;
    fn degree(&self, node: NodeId) -> usize;
}

pub trait LinkIterable<Link>: Graph {
    /// Type of the outgoing neighbor iterator.
    type Iter<'a>: Iterator<Item = Link>
    where
        Self: 'a;

    /// Get a iterator over the outgoing links of the given node.
    fn link_iter(&self, node: NodeId) -> Self::Iter<'_>;
}

/// Graphs where the outgoing arcs of each node occupy a consecutive range of arc ids.
pub trait EdgeRangeGraph: Graph {
    fn neighbor_edge_indices(&self, node: NodeId) -> Range<EdgeId>;

    #[inline(always)]
    fn neighbor_edge_indices_usize(&self, node: NodeId) -> Range<usize> {
        let range = self.neighbor_edge_indices(node);
        range.start as usize..range.end as usize
    }
}

/// Build the `first_out` array of an adjacency array from the node degrees.
pub fn degrees_to_first_out<I: Iterator<Item = EdgeId>>(degrees: I) -> Vec<EdgeId> {
    let mut first_out = vec![0];
    let mut sum = 0;
    for degree in degrees {
        sum += degree;
        first_out.push(sum);
    }
    first_out
}
