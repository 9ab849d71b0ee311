//! Chordal completion of the undirected topology along a node order.
//!
//! Nodes are eliminated by ascending rank. Eliminating a node makes its remaining neighbors a clique.
//! It suffices to merge the upward neighborhood into the lowest upward neighbor though,
//! the rest of the clique gets filled in when that neighbor is eliminated in turn.

use super::*;

pub struct ContractionGraph {
    // upward neighbors of each rank, sorted and without duplicates
    upward: Vec<Vec<NodeId>>,
}

impl ContractionGraph {
    pub fn new<G: LinkIterable<NodeIdT>>(graph: &G, node_order: &NodeOrder) -> Self {
        let n = graph.num_nodes();
        assert_eq!(n, node_order.len(), "node order does not match the graph");

        let mut upward = vec![Vec::new(); n];
        for node in 0..n as NodeId {
            let rank = node_order.rank(node);
            for NodeIdT(head) in graph.link_iter(node) {
                let head_rank = node_order.rank(head);
                if rank < head_rank {
                    upward[rank as usize].push(head_rank);
                } else if head_rank < rank {
                    upward[head_rank as usize].push(rank);
                }
            }
        }
        for neighbors in &mut upward {
            neighbors.sort_unstable();
            neighbors.dedup();
        }

        ContractionGraph { upward }
    }

    /// Eliminate all nodes and return the resulting upward graph in rank space.
    pub fn contract(mut self) -> UnweightedOwnedGraph {
        let num_input_arcs: usize = self.upward.iter().map(Vec::len).sum();

        for rank in 0..self.upward.len() {
            let (lower, higher) = self.upward.split_at_mut(rank + 1);
            if let Some((&lowest, others)) = lower[rank].split_first() {
                let target = &mut higher[lowest as usize - rank - 1];
                if !others.is_empty() {
                    *target = merge_sorted(target, others);
                }
            }
        }

        let graph = UnweightedOwnedGraph::from_adjacency_lists(self.upward);
        report!("num_shortcut_arcs", graph.num_arcs() - num_input_arcs);
        graph
    }
}

/// Union of two sorted, duplicate free lists.
pub fn merge_sorted(a: &[NodeId], b: &[NodeId]) -> Vec<NodeId> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}
