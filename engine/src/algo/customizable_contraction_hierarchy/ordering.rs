//! Fallback node order when none is given.

use super::contraction::merge_sorted;
use super::*;
use crate::algo::dijkstra::State;
use crate::datastr::index_heap::IndexdMinHeap;

/// Greedy minimum degree elimination on the undirected topology.
/// Repeatedly picks the node with the fewest remaining neighbors (ties by lower id) and makes its neighborhood a clique.
/// Much worse than a nested dissection order for large networks, but it needs no coordinates or partitioner.
pub fn min_degree_order<G: LinkIterable<NodeIdT>>(graph: &G) -> NodeOrder {
    let n = graph.num_nodes();
    let mut neighbors: Vec<Vec<NodeId>> = vec![Vec::new(); n];
    for node in 0..n as NodeId {
        for NodeIdT(head) in graph.link_iter(node) {
            if head != node {
                neighbors[node as usize].push(head);
                neighbors[head as usize].push(node);
            }
        }
    }
    for adjacent in &mut neighbors {
        adjacent.sort_unstable();
        adjacent.dedup();
    }

    let mut queue = IndexdMinHeap::new(n);
    for (node, adjacent) in neighbors.iter().enumerate() {
        queue.push(State {
            key: adjacent.len(),
            node: node as NodeId,
        });
    }

    let mut order = Vec::with_capacity(n);
    while let Some(State { node, .. }) = queue.pop() {
        order.push(node);
        let clique = std::mem::take(&mut neighbors[node as usize]);

        for &neighbor in &clique {
            let adjacent = &mut neighbors[neighbor as usize];
            adjacent.retain(|&other| other != node);
            let others: Vec<NodeId> = clique.iter().copied().filter(|&other| other != neighbor).collect();
            *adjacent = merge_sorted(adjacent, &others);
            queue.update_key(State {
                key: adjacent.len(),
                node: neighbor,
            });
        }
    }

    NodeOrder::from_node_order(order)
}
