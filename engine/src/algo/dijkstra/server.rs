//! One-to-one queries which keep the search tree while the source does not change.

use super::*;

/// Answers one-to-one queries with a single source Dijkstra.
/// When the next query has the same source, the search resumes where the previous one stopped
/// instead of starting over, so batches of queries sorted by source share one search.
pub struct Server<'a, G> {
    graph: &'a G,
    weights: &'a [Weight],
    data: DijkstraData,
    source: Option<NodeId>,
}

impl<'a, G: LinkIterable<(NodeIdT, EdgeIdT)>> Server<'a, G> {
    pub fn new(graph: &'a G, weights: &'a [Weight]) -> Self {
        Server {
            graph,
            weights,
            data: DijkstraData::new(graph.num_nodes()),
            source: None,
        }
    }

    /// Shortest distance from `from` to `to`, `None` if `to` is unreachable.
    pub fn distance(&mut self, from: NodeId, to: NodeId) -> Option<Weight> {
        let mut run = DijkstraRun::new(self.graph, self.weights, &mut self.data);
        if self.source != Some(from) {
            run.initialize(from);
            self.source = Some(from);
        }

        while !run.is_settled(to) {
            if run.settle_next_node().is_none() {
                break;
            }
        }

        Some(self.data.distances[to as usize]).filter(|&dist| dist < INFINITY)
    }

    /// Answer the query and store the ids of the edges on the path in `path`.
    /// The path stays empty for unreachable targets and when `from == to`.
    pub fn run(&mut self, from: NodeId, to: NodeId, path: &mut Vec<EdgeId>) -> Option<Weight> {
        path.clear();
        let dist = self.distance(from, to)?;

        let mut node = to;
        while node != from {
            let (pred, edge) = self.data.predecessors[node as usize];
            path.push(edge);
            node = pred;
        }
        path.reverse();

        Some(dist)
    }
}
