//! Dijkstra's algorithm with search data that can be reused across queries.

use super::*;
use crate::datastr::{index_heap::*, timestamped_vector::*};

pub mod server;
pub use server::Server;

/// Priority queue entries
#[derive(Copy, Clone, Eq, PartialEq, Debug, PartialOrd, Ord)]
pub struct State<W> {
    pub key: W,
    pub node: NodeId,
}

impl<W> Indexing for State<W> {
    #[inline]
    fn as_index(&self) -> usize {
        self.node as usize
    }
}

/// Tentative distances, predecessors and the queue of one search.
/// Predecessors store the tail node and the id of the edge a node was reached by.
#[derive(Debug, Clone)]
pub struct DijkstraData {
    pub distances: TimestampedVector<Weight>,
    pub predecessors: Vec<(NodeId, EdgeId)>,
    pub queue: IndexdMinHeap<State<Weight>>,
}

impl DijkstraData {
    pub fn new(n: usize) -> Self {
        DijkstraData {
            distances: TimestampedVector::new(n, INFINITY),
            predecessors: vec![(n as NodeId, EdgeId::MAX); n],
            queue: IndexdMinHeap::new(n),
        }
    }

    /// A node is settled once it has a finite distance and left the queue.
    pub fn is_settled(&self, node: NodeId) -> bool {
        self.distances[node as usize] < INFINITY && !self.queue.contains_index(node as usize)
    }
}

/// A single source search over a graph with links `(head, edge id)` and weights indexed by edge id.
pub struct DijkstraRun<'a, G> {
    graph: &'a G,
    weights: &'a [Weight],
    data: &'a mut DijkstraData,
}

impl<'a, G: LinkIterable<(NodeIdT, EdgeIdT)>> DijkstraRun<'a, G> {
    pub fn new(graph: &'a G, weights: &'a [Weight], data: &'a mut DijkstraData) -> Self {
        DijkstraRun { graph, weights, data }
    }

    /// Discard the previous search and start a new one from `source`.
    pub fn initialize(&mut self, source: NodeId) {
        self.data.queue.clear();
        self.data.distances.reset();
        self.data.distances.set(source as usize, 0);
        self.data.queue.push(State { key: 0, node: source });
    }

    pub fn is_settled(&self, node: NodeId) -> bool {
        self.data.is_settled(node)
    }

    /// Settle the next node and relax its outgoing edges.
    /// Returns `None` when the queue ran empty.
    pub fn settle_next_node(&mut self) -> Option<State<Weight>> {
        let settled = self.data.queue.pop()?;

        for (NodeIdT(head), EdgeIdT(edge)) in self.graph.link_iter(settled.node) {
            let distance = settled.key + self.weights[edge as usize];
            if distance < self.data.distances[head as usize] {
                self.data.distances.set(head as usize, distance);
                self.data.predecessors[head as usize] = (settled.node, edge);

                let next = State { key: distance, node: head };
                if self.data.queue.contains_index(head as usize) {
                    self.data.queue.decrease_key(next);
                } else {
                    self.data.queue.push(next);
                }
            }
        }

        Some(settled)
    }
}
