//! Customizable Contraction Hierarchies.
//!
//! Preprocessing contracts the topology along a node order into a chordal supergraph.
//! Customization computes upward and downward weights for that graph from the current edge costs.
//! Queries walk the elimination tree, see `query`.

use super::*;
use crate::{datastr::node_order::NodeOrder, report::*, util::InRangeOption};

mod contraction;
use contraction::*;
mod customization;
pub use customization::*;
mod ordering;
pub use ordering::min_degree_order;
pub mod query;

/// Metric independent preprocessing.
/// Contracts the undirected topology of `graph` along `node_order`.
pub fn contract<G: LinkIterable<NodeIdT>>(graph: &G, node_order: NodeOrder) -> CCH {
    let contracted = report_time_with_key("CCH contraction", "contraction_time_ms", || ContractionGraph::new(graph, &node_order).contract());
    CCH::new(contracted, node_order)
}

/// The chordal supergraph in rank space plus the structures queries and customization need.
/// Arcs point from lower to higher rank, arc `(low, high)` stands for both directions between the two nodes.
#[derive(Debug, Clone)]
pub struct CCH {
    first_out: Vec<EdgeId>,
    head: Vec<NodeId>,
    tail: Vec<NodeId>,
    node_order: NodeOrder,
    elimination_tree: Vec<InRangeOption<NodeId>>,
    inverted: ReversedGraphWithEdgeIds,
}

impl CCH {
    fn new(contracted_graph: UnweightedOwnedGraph, node_order: NodeOrder) -> CCH {
        let elimination_tree = Self::build_elimination_tree(&contracted_graph);
        let inverted = ReversedGraphWithEdgeIds::reversed(&contracted_graph);

        let mut tail = vec![0; contracted_graph.num_arcs()];
        for node in 0..contracted_graph.num_nodes() as NodeId {
            tail[contracted_graph.neighbor_edge_indices_usize(node)].iter_mut().for_each(|tail| *tail = node);
        }

        let (first_out, head) = contracted_graph.decompose();
        report!("num_cch_arcs", head.len());

        CCH {
            first_out,
            head,
            tail,
            node_order,
            elimination_tree,
            inverted,
        }
    }

    // The parent of a node is its lowest ranked upward neighbor.
    fn build_elimination_tree(graph: &UnweightedOwnedGraph) -> Vec<InRangeOption<NodeId>> {
        (0..graph.num_nodes() as NodeId)
            .map(|node| InRangeOption::new(graph.link_iter(node).map(|NodeIdT(head)| head).min()))
            .collect()
    }

    pub fn first_out(&self) -> &[EdgeId] {
        &self.first_out
    }

    pub fn head(&self) -> &[NodeId] {
        &self.head
    }

    pub fn tail(&self) -> &[NodeId] {
        &self.tail
    }

    pub fn node_order(&self) -> &NodeOrder {
        &self.node_order
    }

    pub fn elimination_tree(&self) -> &[InRangeOption<NodeId>] {
        &self.elimination_tree
    }

    /// Arcs into each node from lower ranked nodes, sorted by tail.
    pub fn inverted(&self) -> &ReversedGraphWithEdgeIds {
        &self.inverted
    }

    /// Id of the arc between the ranks `low < high`, if there is one.
    pub fn edge_index(&self, low: NodeId, high: NodeId) -> Option<EdgeId> {
        let range = self.neighbor_edge_indices_usize(low);
        self.head[range.clone()]
            .binary_search(&high)
            .ok()
            .map(|pos| (range.start + pos) as EdgeId)
    }

    /// Position of every input edge in the CCH.
    pub fn map_input_edges(&self, network: &RoadNetwork) -> Vec<InputArc> {
        (0..network.num_edges() as EdgeId)
            .map(|edge| {
                let tail = self.node_order.rank(network.tail(edge));
                let head = self.node_order.rank(network.head(edge));
                if tail == head {
                    return InputArc::Loop;
                }
                let arc = self
                    .edge_index(tail.min(head), tail.max(head))
                    .unwrap_or_else(|| panic!("input edge {} missing in the contracted graph", edge));
                if tail < head {
                    InputArc::Upward(arc)
                } else {
                    InputArc::Downward(arc)
                }
            })
            .collect()
    }
}

/// Where an input edge ended up in the CCH.
/// `Upward` edges lead from the lower to the higher ranked endpoint of the arc, `Downward` edges the other way.
/// Loops can never be part of a shortest path and have no arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputArc {
    Upward(EdgeId),
    Downward(EdgeId),
    Loop,
}

impl Graph for CCH {
    fn num_nodes(&self) -> usize {
        self.first_out.len() - 1
    }

    fn num_arcs(&self) -> usize {
        self.head.len()
    }

    fn degree(&self, node: NodeId) -> usize {
        let range = self.neighbor_edge_indices_usize(node);
        range.end - range.start
    }
}

impl EdgeRangeGraph for CCH {
    #[inline(always)]
    fn neighbor_edge_indices(&self, node: NodeId) -> std::ops::Range<EdgeId> {
        self.first_out[node as usize]..self.first_out[node as usize + 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a cycle 0 - 1 - 2 - 3 - 0 and a pendant 4 at 2
    fn cycle_network() -> RoadNetwork {
        let edges: Vec<EdgeAttributes> = [(0, 1), (1, 2), (2, 3), (3, 0), (2, 4), (4, 2), (1, 0), (1, 1)]
            .iter()
            .map(|&(tail, head)| EdgeAttributes {
                tail,
                head,
                length: 1.0,
                capacity: 1.0,
                speed: 1.0,
            })
            .collect();
        RoadNetwork::new(5, &edges)
    }

    #[test]
    fn contraction_adds_fill_in_and_builds_tree() {
        let network = cycle_network();
        let cch = contract(&network, NodeOrder::identity(5));

        // contracting 0 connects 1 and 3
        assert!(cch.edge_index(1, 3).is_some());
        assert_eq!(cch.edge_index(0, 2), None);
        assert_eq!(cch.num_arcs(), 7);
        let parents: Vec<Option<NodeId>> = cch.elimination_tree().iter().map(|parent| parent.value()).collect();
        assert_eq!(parents, vec![Some(1), Some(2), Some(3), Some(4), None]);
    }

    #[test]
    fn input_edges_map_to_arcs() {
        let network = cycle_network();
        let order = NodeOrder::from_node_order(vec![4, 0, 2, 1, 3]);
        let cch = contract(&network, order.clone());
        let arcs = cch.map_input_edges(&network);

        for edge in 0..network.num_edges() as EdgeId {
            let (tail, head) = (order.rank(network.tail(edge)), order.rank(network.head(edge)));
            match arcs[edge as usize] {
                InputArc::Upward(arc) => {
                    assert_eq!(cch.tail()[arc as usize], tail);
                    assert_eq!(cch.head()[arc as usize], head);
                }
                InputArc::Downward(arc) => {
                    assert_eq!(cch.tail()[arc as usize], head);
                    assert_eq!(cch.head()[arc as usize], tail);
                }
                InputArc::Loop => assert_eq!(tail, head),
            }
        }
        assert_eq!(arcs[7], InputArc::Loop);
    }
}
