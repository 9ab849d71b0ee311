//! Batched queries on a Customizable Contraction Hierarchy.

use super::*;
use crate::algo::customizable_contraction_hierarchy::{query::BatchedQuery, *};
use crate::datastr::node_order::NodeOrder;
use crate::report::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CchConfig {
    /// Number of OD-pairs per batched query.
    pub batch_size: usize,
}

impl Default for CchConfig {
    fn default() -> Self {
        CchConfig { batch_size: 16 }
    }
}

/// Routes on the CCH of the network.
/// Search arcs are the CCH arcs in upward direction followed by the same arcs in downward direction.
#[derive(Debug)]
pub struct CchAdapter<'g> {
    network: &'g RoadNetwork,
    config: CchConfig,
    node_order: Option<NodeOrder>,
    cch: Option<CCH>,
    input_arcs: Vec<InputArc>,
    metric: Option<CustomizedMetric>,
}

impl<'g> CchAdapter<'g> {
    /// Without a node order, preprocessing computes a minimum degree order.
    pub fn new(network: &'g RoadNetwork, node_order: Option<NodeOrder>, config: CchConfig) -> Self {
        assert!(config.batch_size > 0, "batch size must be positive");
        if let Some(order) = &node_order {
            assert_eq!(order.len(), network.num_nodes(), "node order does not match the network");
        }
        CchAdapter {
            network,
            config,
            node_order,
            cch: None,
            input_arcs: Vec::new(),
            metric: None,
        }
    }

    fn cch(&self) -> &CCH {
        self.cch.as_ref().expect("CCH preprocessing has not run")
    }
}

impl<'g> ShortestPathEngine for CchAdapter<'g> {
    type QueryAlgo<'s> = CchQuery<'s> where Self: 's;

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn num_search_arcs(&self) -> usize {
        2 * self.cch().num_arcs()
    }

    fn preprocess(&mut self) {
        let network = self.network;
        let order = match self.node_order.take() {
            Some(order) => order,
            None => report_time_with_key("min degree ordering", "ordering_time_ms", || min_degree_order(network)),
        };
        let cch = contract(network, order);
        self.input_arcs = cch.map_input_edges(network);
        self.cch = Some(cch);
    }

    fn customize(&mut self, weights: &[Weight]) {
        assert_eq!(weights.len(), self.network.num_edges());
        let metric = customize(self.cch(), &self.input_arcs, weights);
        self.metric = Some(metric);
    }

    fn query_algo(&self) -> CchQuery<'_> {
        let metric = self.metric.as_ref().expect("CCH customization has not run");
        CchQuery(BatchedQuery::new(self.cch(), metric, self.config.batch_size))
    }

    fn propagate_flows_to_input_edges(&self, search_flows: &mut [f64], input_flows: &mut [f64]) {
        let cch = self.cch();
        let metric = self.metric.as_ref().expect("CCH customization has not run");
        let (upward_flows, downward_flows) = search_flows.split_at_mut(cch.num_arcs());
        input_flows.iter_mut().for_each(|flow| *flow = 0.0);
        metric.propagate_flows(cch, upward_flows, downward_flows, input_flows);
    }
}

pub struct CchQuery<'s>(BatchedQuery<'s>);

impl<'s> QueryAlgo for CchQuery<'s> {
    fn run(&mut self, queries: &[Query]) {
        self.0.run(queries)
    }

    fn distance(&self, lane: usize) -> Option<Weight> {
        self.0.distance(lane)
    }

    fn add_flow(&self, lane: usize, volume: f64, search_flows: &mut [f64]) {
        self.0.add_flow(lane, volume, search_flows)
    }

    fn path(&self, lane: usize, path: &mut Vec<EdgeId>) {
        self.0.path(lane, path)
    }
}
