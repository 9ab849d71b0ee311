//! Plain Dijkstra on the input network.

use super::*;
use crate::algo::dijkstra::Server;

/// Routes on the input network itself, so search arcs are input edges.
/// Needs no preprocessing, customization just copies the weights.
#[derive(Debug)]
pub struct DijkstraAdapter<'g> {
    network: &'g RoadNetwork,
    weights: Vec<Weight>,
    batch_size: usize,
}

impl<'g> DijkstraAdapter<'g> {
    pub fn new(network: &'g RoadNetwork) -> Self {
        Self::with_batch_size(network, 1)
    }

    /// Queries in a batch are answered one after another, a larger batch only changes the work distribution.
    pub fn with_batch_size(network: &'g RoadNetwork, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        DijkstraAdapter {
            network,
            weights: vec![INFINITY; network.num_edges()],
            batch_size,
        }
    }
}

impl<'g> ShortestPathEngine for DijkstraAdapter<'g> {
    type QueryAlgo<'s> = DijkstraQuery<'s> where Self: 's;

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn num_search_arcs(&self) -> usize {
        self.network.num_edges()
    }

    fn preprocess(&mut self) {}

    fn customize(&mut self, weights: &[Weight]) {
        assert_eq!(weights.len(), self.network.num_edges());
        self.weights.copy_from_slice(weights);
    }

    fn query_algo(&self) -> DijkstraQuery<'_> {
        DijkstraQuery {
            server: Server::new(self.network, &self.weights),
            paths: vec![Vec::new(); self.batch_size],
            distances: vec![None; self.batch_size],
        }
    }

    fn propagate_flows_to_input_edges(&self, search_flows: &mut [f64], input_flows: &mut [f64]) {
        input_flows.swap_with_slice(search_flows);
    }
}

/// Answers the lanes of a batch one by one and remembers their paths.
pub struct DijkstraQuery<'s> {
    server: Server<'s, RoadNetwork>,
    paths: Vec<Vec<EdgeId>>,
    distances: Vec<Option<Weight>>,
}

impl<'s> QueryAlgo for DijkstraQuery<'s> {
    fn run(&mut self, queries: &[Query]) {
        assert!(queries.len() <= self.paths.len(), "more queries than lanes");
        for (lane, query) in queries.iter().enumerate() {
            self.distances[lane] = self.server.run(query.from, query.to, &mut self.paths[lane]);
        }
    }

    fn distance(&self, lane: usize) -> Option<Weight> {
        self.distances[lane]
    }

    fn add_flow(&self, lane: usize, volume: f64, search_flows: &mut [f64]) {
        for &edge in &self.paths[lane] {
            assert!((edge as usize) < search_flows.len(), "path contains invalid edge {}", edge);
            search_flows[edge as usize] += volume;
        }
    }

    fn path(&self, lane: usize, path: &mut Vec<EdgeId>) {
        path.clear();
        path.extend_from_slice(&self.paths[lane]);
    }
}
